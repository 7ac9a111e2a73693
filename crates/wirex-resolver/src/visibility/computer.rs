//! The dependency walk over a resolved container.
//!
//! Entries come out in a fixed order: a fragment's host first, then the
//! required-module closure, then the exporters of imported packages sorted
//! by `name_version`. Framework extensions attached to the system module
//! never appear as entries; their exports are boot classpath rules.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use log::trace;

use crate::container::{Container, ModuleRevision, PackageWire, RevisionId, Wiring};
use crate::error::{ResolverError, Result};

use super::{AccessRule, DependencyEntry, EntryKind, VisiblePackages};

/// Walks the wiring of a resolved container to compute, for one module,
/// every other module it may compile against and which of their packages
/// it may use.
///
/// The walk is pure with respect to the container: the same target yields
/// the same entries. Visible-package sets are memoized per consumer.
pub struct DependencyComputer<'c> {
    container: &'c Container,
    visible: HashMap<RevisionId, Rc<VisiblePackages>>,
}

/// Mutable state of one walk
struct Walk<'w, A> {
    visible: &'w VisiblePackages,
    added: HashSet<RevisionId>,
    entries: Vec<DependencyEntry<A>>,
}

impl<'c> DependencyComputer<'c> {
    pub fn new(container: &'c Container) -> Self {
        Self {
            container,
            visible: HashMap::new(),
        }
    }

    fn wiring(&self, id: RevisionId) -> Result<&'c Wiring> {
        let container = self.container;
        container.wiring(id).ok_or_else(|| {
            ResolverError::Internal(format!(
                "module {} has no wiring; only resolved modules can be walked",
                container.revision(id).identity()
            ))
        })
    }

    /// Ordered dependency entries of `target`.
    ///
    /// Order: a fragment's host first (unrestricted), then the
    /// required-module closure, then the exporters of imported packages
    /// sorted by `name_version`. The target itself never appears.
    pub fn compute_dependencies<A, F>(&mut self, target: RevisionId, lookup: F) -> Result<Vec<DependencyEntry<A>>>
    where
        F: Fn(&ModuleRevision) -> Option<A>,
    {
        let wiring = self.wiring(target)?;
        let visible = self.visible_packages(target)?;

        let mut walk = Walk {
            visible: &visible,
            added: HashSet::new(),
            entries: Vec::new(),
        };
        // Seeded so a module importing its own package never lists itself
        walk.added.insert(target);

        if let Some(host) = wiring.host {
            self.add_host(host, &mut walk, &lookup)?;
        }

        for wire in &wiring.required {
            self.add_dependency(wire.provider, &mut walk, &lookup)?;
        }

        let mut exporters: Vec<(String, RevisionId)> = visible
            .exporters()
            .map(|id| (self.container.revision(id).identity(), id))
            .collect();
        exporters.sort();
        for (_, exporter) in exporters {
            self.add_via_import(exporter, &mut walk, &lookup)?;
        }

        trace!(
            "{} depends on {} modules",
            self.container.revision(target).identity(),
            walk.entries.len()
        );
        Ok(walk.entries)
    }

    /// Access rules for packages the system module receives from framework
    /// extension fragments; these belong on the boot classpath
    pub fn boot_classpath_access_rules(&self) -> Vec<AccessRule> {
        let container = self.container;
        let system = container.system_module();
        let Some(wiring) = container.wiring(system) else {
            return Vec::new();
        };
        let consumer = container.revision(system).name();

        let mut rules: Vec<AccessRule> = Vec::new();
        for exported in &wiring.exports {
            if exported.declared_by == system {
                continue;
            }
            if !container.revision(exported.declared_by).descriptor.is_framework_extension() {
                continue;
            }
            let rule = AccessRule::for_export(consumer, &exported.export);
            if !rules.contains(&rule) {
                rules.push(rule);
            }
        }
        rules
    }

    fn entry<A, F>(&self, revision: RevisionId, rules: Option<Vec<AccessRule>>, lookup: &F) -> DependencyEntry<A>
    where
        F: Fn(&ModuleRevision) -> Option<A>,
    {
        let module = self.container.revision(revision);
        DependencyEntry {
            revision,
            identity: module.identity(),
            kind: EntryKind::of(module),
            rules,
            artifact: lookup(module),
        }
    }

    fn add_host<A, F>(&self, host: RevisionId, walk: &mut Walk<'_, A>, lookup: &F) -> Result<()>
    where
        F: Fn(&ModuleRevision) -> Option<A>,
    {
        if !walk.added.insert(host) {
            return Ok(());
        }
        let wiring = self.wiring(host)?;
        walk.entries.push(self.entry(host, None, lookup));

        for wire in &wiring.required {
            self.add_dependency(wire.provider, walk, lookup)?;
        }
        Ok(())
    }

    /// Resolved fragments of `host` that take part in the compile classpath.
    ///
    /// Framework extensions of the system module are left out; they extend
    /// the boot classpath instead.
    fn classpath_fragments(&self, host: RevisionId, wiring: &'c Wiring) -> Vec<RevisionId> {
        let container = self.container;
        let system = host == container.system_module();
        wiring
            .fragments
            .iter()
            .copied()
            .filter(|&fragment| container.is_resolved(fragment))
            .filter(|&fragment| !(system && container.revision(fragment).descriptor.is_framework_extension()))
            .collect()
    }

    /// Add a required module, its fragments and its own required modules
    fn add_dependency<A, F>(&self, revision: RevisionId, walk: &mut Walk<'_, A>, lookup: &F) -> Result<()>
    where
        F: Fn(&ModuleRevision) -> Option<A>,
    {
        if !walk.added.insert(revision) {
            return Ok(());
        }
        let wiring = self.wiring(revision)?;
        let rules = walk.visible.inclusions(self.container, revision);
        walk.entries.push(self.entry(revision, Some(rules), lookup));

        for fragment in self.classpath_fragments(revision, wiring) {
            self.add_dependency(fragment, walk, lookup)?;
        }
        for wire in &wiring.required {
            self.add_dependency(wire.provider, walk, lookup)?;
        }
        Ok(())
    }

    /// Add the exporter of an imported package together with its fragments
    fn add_via_import<A, F>(&self, revision: RevisionId, walk: &mut Walk<'_, A>, lookup: &F) -> Result<()>
    where
        F: Fn(&ModuleRevision) -> Option<A>,
    {
        if !walk.added.insert(revision) {
            return Ok(());
        }
        let wiring = self.wiring(revision)?;
        let rules = walk.visible.inclusions(self.container, revision);
        walk.entries.push(self.entry(revision, Some(rules), lookup));

        for fragment in self.classpath_fragments(revision, wiring) {
            self.add_via_import(fragment, walk, lookup)?;
        }
        Ok(())
    }

    // ---- visible packages ----

    /// Packages visible to `target`, grouped by exporter.
    ///
    /// Fragments and their host share one set, computed from the host's
    /// wiring and checked against the host's name.
    pub fn visible_packages(&mut self, target: RevisionId) -> Result<Rc<VisiblePackages>> {
        let consumer = self.wiring(target)?.host_or_self();
        if let Some(visible) = self.visible.get(&consumer) {
            return Ok(Rc::clone(visible));
        }

        let container = self.container;
        let wiring = self.wiring(consumer)?;
        let name = container.revision(consumer).name();
        let mut visible = VisiblePackages::new();

        for wire in &wiring.packages {
            visible.add(wire.provider, AccessRule::for_export(name, &wire.export));
            let mut seen = HashSet::from([consumer, wire.provider]);
            self.add_split_sources(wire.provider, &wire.package, name, &mut seen, &mut visible)?;
            self.add_other_exporters(wire, name, &mut seen, &mut visible);
        }

        for wire in &wiring.required {
            let mut seen = HashSet::from([consumer]);
            self.add_required_exports(wire.provider, name, &mut seen, &mut visible)?;
        }

        let visible = Rc::new(visible);
        self.visible.insert(consumer, Rc::clone(&visible));
        Ok(visible)
    }

    /// A package exported by `provider` may also come from modules the
    /// provider requires; those sources are visible too
    fn add_split_sources(
        &self,
        provider: RevisionId,
        package: &str,
        consumer: &str,
        seen: &mut HashSet<RevisionId>,
        visible: &mut VisiblePackages,
    ) -> Result<()> {
        let wiring = self.wiring(provider)?;
        for wire in &wiring.required {
            if !seen.insert(wire.provider) {
                continue;
            }
            let required = self.wiring(wire.provider)?;
            if let Some(exported) = required.exported(package) {
                visible.add(wire.provider, AccessRule::for_export(consumer, &exported.export));
                self.add_split_sources(wire.provider, package, consumer, seen, visible)?;
            }
        }

        // A provider exporting the package while importing it from elsewhere
        if wiring.exported(package).is_some() {
            if let Some(import) = wiring.package_wire(package) {
                if seen.insert(import.provider) {
                    visible.add(import.provider, AccessRule::for_export(consumer, &import.export));
                    self.add_split_sources(import.provider, package, consumer, seen, visible)?;
                }
            }
        }
        Ok(())
    }

    /// Every other resolved host exporting the wired package in a version
    /// the import accepts, in installation order
    fn add_other_exporters(
        &self,
        wire: &PackageWire,
        consumer: &str,
        seen: &mut HashSet<RevisionId>,
        visible: &mut VisiblePackages,
    ) {
        let container = self.container;
        for revision in container.revisions() {
            if !container.is_resolved(revision.id) {
                continue;
            }
            let Some(wiring) = container.wiring(revision.id) else {
                continue;
            };
            if wiring.is_fragment() {
                continue;
            }
            let Some(exported) = wiring.exported(&wire.package) else {
                continue;
            };
            if !wire.requirement.range.includes(&exported.export.version) {
                continue;
            }
            if seen.insert(revision.id) {
                visible.add(revision.id, AccessRule::for_export(consumer, &exported.export));
            }
        }
    }

    /// Every export of a required module, then recursively of the modules
    /// it re-exports
    fn add_required_exports(
        &self,
        provider: RevisionId,
        consumer: &str,
        seen: &mut HashSet<RevisionId>,
        visible: &mut VisiblePackages,
    ) -> Result<()> {
        if !seen.insert(provider) {
            return Ok(());
        }
        let wiring = self.wiring(provider)?;
        for exported in &wiring.exports {
            visible.add(provider, AccessRule::for_export(consumer, &exported.export));
        }
        for wire in wiring.required.iter().filter(|w| w.reexport) {
            self.add_required_exports(wire.provider, consumer, seen, visible)?;
        }
        Ok(())
    }
}
