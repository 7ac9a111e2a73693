//! Graph resolution over a [`Container`].
//!
//! Resolution runs in three phases that repeat until nothing changes:
//!
//! 1. **Elimination**: revisions whose platform filter or execution
//!    environments do not match are dropped up front. Then fragments are
//!    attached to their best host and every host whose mandatory
//!    requirements (its own and its fragments') have no viable candidate is
//!    dropped, until a fixpoint is reached. A fragment whose own
//!    requirements fail is detached without failing its host.
//! 2. **Wiring**: every surviving host picks its providers. Choices only
//!    depend on the surviving set, so hosts are wired in parallel batches.
//! 3. **Uses**: package wires are checked for consistent "uses" sources,
//!    either for the target only (relaxed) or for every host with a bounded
//!    repair search (strict). A module failing here restarts elimination.

use std::collections::HashMap;
use std::time::Duration;

use log::{debug, trace};

use crate::descriptor::{PackageExport, PackageImport, RequiredModule};

use super::{
    BatchExecutor, Container, ExportedPackage, ModuleWire, PackageWire, Policy, RejectionReason,
    RequirementKind, RevisionId, RevisionState, UnmetRequirement, Wiring,
};

/// Knobs for one resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveSettings {
    /// Enforce "uses" constraints for every module instead of validating only the target
    pub keep_uses: bool,
    pub batch_size: usize,
    pub batch_timeout: Duration,
    pub threads: usize,
    /// Uses escalations already performed for this target
    pub escalations: u32,
    /// Fragment-sibling pruning passes already performed for this target
    pub prunings: u32,
}

impl ResolveSettings {
    pub const MAX_ESCALATIONS: u32 = 1;
    pub const MAX_PRUNINGS: u32 = 1;

    pub fn can_escalate(&self) -> bool {
        !self.keep_uses && self.escalations < Self::MAX_ESCALATIONS
    }

    /// Settings for the strict retry
    pub fn escalated(&self) -> Self {
        Self {
            keep_uses: true,
            escalations: self.escalations + 1,
            ..self.clone()
        }
    }

    pub fn can_prune(&self) -> bool {
        self.prunings < Self::MAX_PRUNINGS
    }

    pub fn pruned(&self) -> Self {
        Self {
            prunings: self.prunings + 1,
            ..self.clone()
        }
    }
}

impl Default for ResolveSettings {
    fn default() -> Self {
        Self {
            keep_uses: false,
            batch_size: 10,
            batch_timeout: Duration::from_millis(2000),
            threads: 1,
            escalations: 0,
            prunings: 0,
        }
    }
}

/// A requirement together with the revision that declared it.
#[derive(Debug, Clone, Copy)]
pub(super) enum Requirement<'a> {
    Require(&'a RequiredModule),
    Import(&'a PackageImport),
}

/// A package export reachable through a surviving host.
#[derive(Debug, Clone, Copy)]
pub(super) struct ExportCandidate<'a> {
    pub provider: RevisionId,
    pub exported_by: RevisionId,
    pub export: &'a PackageExport,
}

/// Working set of one resolution pass.
pub(super) struct ResolveState<'a> {
    pub container: &'a Container,
    pub settings: &'a ResolveSettings,
    pub policy: Policy,
    pub eligible: Vec<bool>,
    pub failures: Vec<Vec<UnmetRequirement>>,
    /// Host each surviving fragment is attached to
    pub hosts: Vec<Option<RevisionId>>,
    pub exporters: HashMap<&'a str, Vec<ExportCandidate<'a>>>,
    pub wirings: Vec<Option<Wiring>>,
}

impl Container {
    /// Resolve every installed revision.
    ///
    /// `target` is the module the caller cares about; with relaxed settings
    /// only its wiring is checked for "uses" consistency.
    pub fn resolve(&mut self, settings: &ResolveSettings, target: Option<RevisionId>) {
        for state in self.states.iter_mut() {
            *state = RevisionState::Resolving;
        }

        let (eligible, wirings, failures) = {
            let mut state = ResolveState::new(self, settings);
            state.run(target);
            (state.eligible, state.wirings, state.failures)
        };

        for (id, resolved) in eligible.into_iter().enumerate() {
            self.states[id] = if resolved {
                RevisionState::Resolved
            } else {
                RevisionState::Unresolved
            };
        }
        self.wirings = wirings;
        self.unmet = failures;

        debug!(
            "Resolved {} of {} revisions",
            self.states.iter().filter(|s| **s == RevisionState::Resolved).count(),
            self.revisions.len()
        );
    }
}

impl<'a> ResolveState<'a> {
    fn new(container: &'a Container, settings: &'a ResolveSettings) -> Self {
        let n = container.len();
        Self {
            container,
            settings,
            policy: Policy::new(),
            eligible: vec![true; n],
            failures: vec![Vec::new(); n],
            hosts: vec![None; n],
            exporters: HashMap::new(),
            wirings: vec![None; n],
        }
    }

    fn run(&mut self, target: Option<RevisionId>) {
        self.check_environment();
        loop {
            self.eliminate();
            self.wire_all();

            let failed = if self.settings.keep_uses {
                self.enforce_uses()
            } else {
                target.map(|t| self.validate_target_uses(t)).unwrap_or(false)
            };
            if !failed {
                break;
            }
            debug!("Uses check removed revisions, eliminating again");
        }

        for id in 0..self.eligible.len() {
            if !self.eligible[id] {
                self.wirings[id] = None;
            }
        }
    }

    pub(super) fn identity(&self, id: RevisionId) -> String {
        self.container.revision(id).identity()
    }

    pub(super) fn fail(&mut self, id: RevisionId, unmet: UnmetRequirement) {
        trace!("{} fails: {}", self.identity(id), unmet);
        self.eligible[id] = false;
        self.hosts[id] = None;
        self.failures[id].push(unmet);
    }

    /// Drop revisions whose platform filter or execution environments do
    /// not match the host runtime
    fn check_environment(&mut self) {
        let container = self.container;
        for revision in container.revisions() {
            if revision.is_system() {
                continue;
            }
            let identity = revision.identity();
            let descriptor = &revision.descriptor;

            if let Some(filter) = &descriptor.platform_filter {
                if !filter.matches(container.environment()) {
                    self.fail(
                        revision.id,
                        UnmetRequirement::new(RequirementKind::PlatformFilter, filter.to_string(), identity),
                    );
                    continue;
                }
            }

            let environments = &descriptor.execution_environments;
            if !environments.is_empty()
                && !environments
                    .iter()
                    .any(|e| container.capabilities().provides_environment(e))
            {
                self.fail(
                    revision.id,
                    UnmetRequirement::new(RequirementKind::ExecutionEnvironment, environments.join(","), identity),
                );
            }
        }
    }

    fn is_host(&self, id: RevisionId) -> bool {
        !self.container.revision(id).is_fragment()
    }

    /// Surviving fragments attached to `host`, in installation order
    pub(super) fn attached(&self, host: RevisionId) -> Vec<RevisionId> {
        (0..self.hosts.len())
            .filter(|&f| self.eligible[f] && self.hosts[f] == Some(host))
            .collect()
    }

    /// Requirements of a host merged with those of its attached fragments
    pub(super) fn requirements_of(&self, host: RevisionId) -> Vec<(RevisionId, Requirement<'a>)> {
        let container = self.container;
        let mut requirements = Vec::new();
        for id in std::iter::once(host).chain(self.attached(host)) {
            let descriptor = &container.revision(id).descriptor;
            requirements.extend(descriptor.requires.iter().map(|r| (id, Requirement::Require(r))));
            requirements.extend(descriptor.imports.iter().map(|i| (id, Requirement::Import(i))));
        }
        requirements
    }

    fn rejection_for(&self, candidate: RevisionId) -> RejectionReason {
        match self.failures[candidate].first() {
            Some(unmet)
                if matches!(
                    unmet.kind,
                    RequirementKind::PlatformFilter | RequirementKind::ExecutionEnvironment
                ) =>
            {
                RejectionReason::FilterMismatch(unmet.name.clone())
            }
            _ => RejectionReason::Unresolved,
        }
    }

    // ---- elimination ----

    /// Surviving hosts named `name` whose version is in `range`
    fn module_candidates(&self, name: &str, range: &wirex_version::VersionRange, exclude: RevisionId) -> Vec<RevisionId> {
        self.container
            .by_name(name)
            .iter()
            .copied()
            .filter(|&c| c != exclude && self.eligible[c] && self.is_host(c))
            .filter(|&c| range.includes(self.container.revision(c).version()))
            .collect()
    }

    fn unmet_module(
        &self,
        kind: RequirementKind,
        name: &str,
        range: &wirex_version::VersionRange,
        declared_by: RevisionId,
    ) -> UnmetRequirement {
        let mut unmet = UnmetRequirement::new(kind, name, self.identity(declared_by)).with_range(range.clone());
        for &candidate in self.container.by_name(name) {
            if candidate == declared_by || !self.is_host(candidate) {
                continue;
            }
            let revision = self.container.revision(candidate);
            let reason = if !range.includes(revision.version()) {
                RejectionReason::VersionMismatch {
                    found: revision.version().clone(),
                    range: range.clone(),
                }
            } else {
                self.rejection_for(candidate)
            };
            unmet = unmet.with_candidate(revision.identity(), reason);
        }
        unmet
    }

    fn unmet_import(&self, import: &PackageImport, declared_by: RevisionId) -> UnmetRequirement {
        let mut unmet = UnmetRequirement::new(RequirementKind::Import, &import.name, self.identity(declared_by))
            .with_range(import.range.clone());
        for revision in self.container.revisions() {
            let Some(export) = revision.descriptor.export(&import.name) else {
                continue;
            };
            let reason = if !import.range.includes(&export.version) {
                RejectionReason::VersionMismatch {
                    found: export.version.clone(),
                    range: import.range.clone(),
                }
            } else {
                self.rejection_for(revision.id)
            };
            unmet = unmet.with_candidate(revision.identity(), reason);
        }
        unmet
    }

    fn best_host(&self, fragment: RevisionId) -> Result<RevisionId, UnmetRequirement> {
        let descriptor = &self.container.revision(fragment).descriptor;
        let Some(host) = &descriptor.fragment_host else {
            return Err(UnmetRequirement::new(RequirementKind::Host, "", self.identity(fragment)));
        };
        let candidates = self.module_candidates(&host.name, &host.range, fragment);
        self.policy
            .select_best(self.container, &candidates)
            .ok_or_else(|| self.unmet_module(RequirementKind::Host, &host.name, &host.range, fragment))
    }

    /// Effective exports of every surviving host
    fn index_exports(&mut self) {
        let container = self.container;
        let mut exporters: HashMap<&'a str, Vec<ExportCandidate<'a>>> = HashMap::new();
        for host in 0..container.len() {
            if !self.eligible[host] || !self.is_host(host) {
                continue;
            }
            for id in std::iter::once(host).chain(self.attached(host)) {
                for export in &container.revision(id).descriptor.exports {
                    exporters.entry(export.name.as_str()).or_default().push(ExportCandidate {
                        provider: host,
                        exported_by: id,
                        export,
                    });
                }
            }
        }
        self.exporters = exporters;
    }

    /// Providers for an import in preference order; the importer's own
    /// export, if any, comes last
    pub(super) fn import_providers(&self, importer: RevisionId, import: &PackageImport) -> Vec<ExportCandidate<'a>> {
        let mut providers: Vec<ExportCandidate<'a>> = self
            .exporters
            .get(import.name.as_str())
            .map(|candidates| {
                candidates
                    .iter()
                    .copied()
                    .filter(|c| import.range.includes(&c.export.version))
                    .collect()
            })
            .unwrap_or_default();
        providers.sort_by(|a, b| {
            (a.provider == importer)
                .cmp(&(b.provider == importer))
                .then_with(|| {
                    self.policy.compare_exports(
                        self.container,
                        (a.provider, &a.export.version),
                        (b.provider, &b.export.version),
                    )
                })
        });
        providers
    }

    fn eliminate(&mut self) {
        loop {
            let mut changed = false;

            for fragment in 0..self.container.len() {
                if !self.eligible[fragment] || self.is_host(fragment) {
                    continue;
                }
                match self.best_host(fragment) {
                    Ok(host) => self.hosts[fragment] = Some(host),
                    Err(unmet) => {
                        self.fail(fragment, unmet);
                        changed = true;
                    }
                }
            }
            // Fragments that lost their host are attached again first
            if changed {
                continue;
            }

            self.index_exports();

            for host in 0..self.container.len() {
                if !self.eligible[host] || !self.is_host(host) {
                    continue;
                }
                for (declared_by, requirement) in self.requirements_of(host) {
                    if !self.eligible[declared_by] {
                        continue;
                    }
                    let unmet = match requirement {
                        Requirement::Require(require) => {
                            if require.optional || !self.module_candidates(&require.name, &require.range, host).is_empty() {
                                continue;
                            }
                            self.unmet_module(RequirementKind::Require, &require.name, &require.range, declared_by)
                        }
                        Requirement::Import(import) => {
                            if import.optional || !self.import_providers(host, import).is_empty() {
                                continue;
                            }
                            self.unmet_import(import, declared_by)
                        }
                    };
                    self.fail(declared_by, unmet);
                    changed = true;
                    if declared_by == host {
                        break;
                    }
                }
            }

            if !changed {
                break;
            }
        }
    }

    // ---- wiring ----

    fn wire_all(&mut self) {
        let hosts: Vec<RevisionId> = (0..self.container.len())
            .filter(|&id| self.eligible[id] && self.is_host(id))
            .collect();

        let executor = BatchExecutor::new(
            self.settings.batch_size,
            self.settings.batch_timeout,
            self.settings.threads,
        );
        let wired = {
            let this = &*self;
            executor.run(&hosts, |&host| this.wire_host(host))
        };

        let mut wirings = vec![None; self.container.len()];
        for wiring in wired {
            let id = wiring.revision;
            wirings[id] = Some(wiring);
        }
        for fragment in 0..self.container.len() {
            if let (true, Some(host)) = (self.eligible[fragment], self.hosts[fragment]) {
                wirings[fragment] = Some(Wiring::for_fragment(fragment, host));
            }
        }
        self.wirings = wirings;
    }

    fn wire_host(&self, host: RevisionId) -> Wiring {
        let container = self.container;
        let mut wiring = Wiring::for_host(host);
        wiring.fragments = self.attached(host);

        for (declared_by, requirement) in self.requirements_of(host) {
            match requirement {
                Requirement::Require(require) => {
                    let candidates = self.module_candidates(&require.name, &require.range, host);
                    let Some(provider) = self.policy.select_best(container, &candidates) else {
                        continue;
                    };
                    if wiring.required.iter().any(|w| w.provider == provider) {
                        continue;
                    }
                    wiring.required.push(ModuleWire {
                        provider,
                        reexport: require.reexport,
                        requirement: require.clone(),
                        declared_by,
                    });
                }
                Requirement::Import(import) => {
                    if wiring.package_wire(&import.name).is_some() {
                        continue;
                    }
                    let Some(best) = self.import_providers(host, import).into_iter().next() else {
                        continue;
                    };
                    // Importing a package the module exports itself needs no wire
                    if best.provider == host {
                        continue;
                    }
                    wiring.packages.push(PackageWire {
                        package: import.name.clone(),
                        provider: best.provider,
                        exported_by: best.exported_by,
                        export: best.export.clone(),
                        requirement: import.clone(),
                        declared_by,
                    });
                }
            }
        }

        for id in std::iter::once(host).chain(wiring.fragments.iter().copied()) {
            for export in &container.revision(id).descriptor.exports {
                wiring.exports.push(ExportedPackage {
                    declared_by: id,
                    export: export.clone(),
                });
            }
        }

        wiring
    }
}
