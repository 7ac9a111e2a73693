//! The module graph resolver.
//!
//! Builds a fresh [`Container`] per attempt from the target module, the
//! other candidate modules and a system module, resolves it and retries
//! with different [`ResolveSettings`] when the target fails:
//!
//! 1. A first attempt with the configured "uses" handling (relaxed by default).
//! 2. If the target is unresolved and uses were relaxed, exactly one strict retry.
//! 3. If the target resolved but unresolved fragments of its host remain,
//!    exactly one retry without those fragments.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use wirex_version::Version;

use crate::classpath::{self, ClasspathEntry};
use crate::config::ResolverConfig;
use crate::container::{
    Container, ModuleOrigin, ModuleRevision, ResolveSettings, RevisionId, SystemCapabilities, SYSTEM_MODULE_NAME,
};
use crate::descriptor::{ModuleDescriptor, PackageExport};
use crate::error::{ResolverError, Result};
use crate::reader::DescriptorReader;
use crate::visibility::{AccessRule, DependencyComputer, DependencyEntry};

/// A candidate module handed to the resolver.
#[derive(Debug, Clone)]
pub struct ModuleInput {
    pub descriptor: Arc<ModuleDescriptor>,
    pub location: Option<PathBuf>,
    pub origin: ModuleOrigin,
}

impl ModuleInput {
    /// A module built in the current reactor
    pub fn reactor(descriptor: Arc<ModuleDescriptor>, location: impl Into<PathBuf>) -> Self {
        Self {
            descriptor,
            location: Some(location.into()),
            origin: ModuleOrigin::Reactor,
        }
    }

    /// A module provided from outside the build
    pub fn external(descriptor: Arc<ModuleDescriptor>, location: Option<PathBuf>) -> Self {
        Self {
            descriptor,
            location,
            origin: ModuleOrigin::External,
        }
    }

    fn name(&self) -> &str {
        &self.descriptor.symbolic_name
    }

    fn describe(&self) -> String {
        match &self.location {
            Some(location) => format!("{} ({})", self.descriptor.identity(), location.display()),
            None => self.descriptor.identity(),
        }
    }
}

/// A successfully resolved container together with its target.
#[derive(Debug)]
pub struct Resolution {
    pub container: Container,
    pub target: RevisionId,
    /// Number of attempts it took, the successful one included
    pub attempts: u32,
    pub settings: ResolveSettings,
}

impl Resolution {
    /// Ordered dependency entries of the target
    pub fn dependencies<A, F>(&self, lookup: F) -> Result<Vec<DependencyEntry<A>>>
    where
        F: Fn(&ModuleRevision) -> Option<A>,
    {
        DependencyComputer::new(&self.container).compute_dependencies(self.target, lookup)
    }

    /// Access rules contributed to the boot classpath by framework extensions
    pub fn boot_classpath_access_rules(&self) -> Vec<AccessRule> {
        DependencyComputer::new(&self.container).boot_classpath_access_rules()
    }

    /// Classpath of the target
    pub fn classpath(&self) -> Result<Vec<ClasspathEntry>> {
        let entries = self.dependencies(|_| None::<()>)?;
        Ok(classpath::assemble(&entries))
    }
}

/// Resolves one target module against a set of candidate modules.
#[derive(Debug, Clone, Default)]
pub struct ModuleResolver {
    config: ResolverConfig,
}

impl ModuleResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve `target` against `modules`.
    ///
    /// The target is installed as a reactor module whatever its declared
    /// origin; an entry of `modules` at the target's location is ignored.
    pub fn resolve(&self, target: &ModuleInput, modules: &[ModuleInput]) -> Result<Resolution> {
        let candidates = self.select_candidates(target, modules);
        self.resolve_with(target, &candidates, self.config.initial_settings())
    }

    /// Load descriptors from disk and resolve the module at `target`.
    ///
    /// `reactor` and `platform` list module locations; the target may or
    /// may not be part of `reactor`.
    pub fn resolve_locations(&self, target: &Path, reactor: &[PathBuf], platform: &[PathBuf]) -> Result<Resolution> {
        let reader = DescriptorReader::new(self.config.existence_timeout());

        let target_input = ModuleInput::reactor(reader.load(target)?, target);
        let mut modules = Vec::with_capacity(reactor.len() + platform.len());
        for location in reactor {
            modules.push(ModuleInput::reactor(reader.load(location)?, location));
        }
        for location in platform {
            modules.push(ModuleInput::external(reader.load(location)?, Some(location.clone())));
        }

        self.resolve(&target_input, &modules)
    }

    /// Drop duplicates of the target and external modules overridden by a
    /// reactor module of the same name
    fn select_candidates<'m>(&self, target: &'m ModuleInput, modules: &'m [ModuleInput]) -> Vec<&'m ModuleInput> {
        let same_location = |m: &ModuleInput| {
            matches!((&m.location, &target.location), (Some(a), Some(b)) if same_path(a, b))
        };
        let reactor_names: Vec<&str> = std::iter::once(target.name())
            .chain(
                modules
                    .iter()
                    .filter(|m| m.origin == ModuleOrigin::Reactor)
                    .map(ModuleInput::name),
            )
            .collect();

        let mut selected = Vec::with_capacity(modules.len());
        for module in modules {
            if same_location(module) {
                continue;
            }
            if module.origin == ModuleOrigin::External && reactor_names.contains(&module.name()) {
                warn!(
                    "{} is overridden by the reactor module of the same name",
                    module.describe()
                );
                continue;
            }
            selected.push(module);
        }
        selected
    }

    /// One resolution attempt; recurses at most once per retry kind, as
    /// counted in `settings`
    fn resolve_with(&self, target: &ModuleInput, modules: &[&ModuleInput], settings: ResolveSettings) -> Result<Resolution> {
        let attempts = 1 + settings.escalations + settings.prunings;
        let (mut container, installed) = self.build_container(target, modules)?;
        let target_id = 1;

        debug!(
            "Resolving {} against {} modules (attempt {}, uses {})",
            target.describe(),
            modules.len(),
            attempts,
            if settings.keep_uses { "enforced" } else { "relaxed" }
        );
        container.resolve(&settings, Some(target_id));

        if !container.is_resolved(target_id) {
            if settings.can_escalate() {
                info!(
                    "Resolution of {} failed with relaxed uses constraints, retrying with uses constraints enforced",
                    target.describe()
                );
                return self.resolve_with(target, modules, settings.escalated());
            }

            let report = container.failure_report(target_id, attempts);
            warn!("{}", report.summary());
            debug!("{}", report.detail());
            debug!("Resolver state:\n{}", report.state);
            return Err(ResolverError::Unresolved(Box::new(report)));
        }

        let siblings = unresolved_siblings(&container, target_id);
        if !siblings.is_empty() && settings.can_prune() {
            let pruned: Vec<&ModuleInput> = modules
                .iter()
                .copied()
                .filter(|m| {
                    !siblings
                        .iter()
                        .any(|&id| installed[id].is_some_and(|i| std::ptr::eq(i, *m)))
                })
                .collect();
            for &id in &siblings {
                warn!(
                    "Fragment {} did not resolve together with {}, removing it",
                    container.revision(id).identity(),
                    target.describe()
                );
            }
            return self.resolve_with(target, &pruned, settings.pruned());
        }

        Ok(Resolution {
            container,
            target: target_id,
            attempts,
            settings,
        })
    }

    /// Install the system module, then the target, then the other modules.
    ///
    /// Returns the container and, per revision id, the input it came from.
    fn build_container<'m>(
        &self,
        target: &'m ModuleInput,
        modules: &[&'m ModuleInput],
    ) -> Result<(Container, Vec<Option<&'m ModuleInput>>)> {
        let capabilities = SystemCapabilities::assemble(
            &self.config.profiles,
            self.config.profile.as_deref(),
            &self.config.provided_packages,
        )?;

        let mut providers = modules.iter().copied().filter(|m| m.descriptor.system_module);
        let provided = providers.next();
        for extra in providers {
            warn!(
                "{} also provides the system module identity and is ignored",
                extra.describe()
            );
        }

        let (system, system_location, system_input) = match provided {
            Some(input) => (
                Arc::new(extend_system(&input.descriptor, &capabilities)),
                input.location.clone(),
                Some(input),
            ),
            None => (Arc::new(synthesize_system(&capabilities)), None, None),
        };

        let mut container = Container::new(
            self.config.environment.clone(),
            capabilities,
            system,
            system_location,
        );
        let mut installed: Vec<Option<&'m ModuleInput>> = vec![system_input];

        let rest = modules.iter().copied().filter(|m| !m.descriptor.system_module);
        for input in std::iter::once(target).chain(rest) {
            container.install(with_extra_requirements(&input.descriptor), input.location.clone(), input.origin);
            installed.push(Some(input));
        }

        Ok((container, installed))
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    match (std::path::absolute(a), std::path::absolute(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn with_extra_requirements(descriptor: &Arc<ModuleDescriptor>) -> Arc<ModuleDescriptor> {
    if descriptor.extra_requires.is_empty() {
        Arc::clone(descriptor)
    } else {
        Arc::new(descriptor.with_extra_requirements())
    }
}

/// System module assembled from the runtime capabilities
fn synthesize_system(capabilities: &SystemCapabilities) -> ModuleDescriptor {
    if capabilities.packages.is_empty() {
        warn!("The system module exports no packages; check the execution profile configuration");
    }
    let mut system = ModuleDescriptor::new(SYSTEM_MODULE_NAME, Version::empty()).as_system_module();
    for package in &capabilities.packages {
        system.exports.push(PackageExport::new(package.clone()));
    }
    system
}

/// A provided system module also exports the profile packages it does not
/// declare itself
fn extend_system(descriptor: &ModuleDescriptor, capabilities: &SystemCapabilities) -> ModuleDescriptor {
    let mut system = descriptor.clone();
    for package in &capabilities.packages {
        if system.export(package).is_none() {
            system.exports.push(PackageExport::new(package.clone()));
        }
    }
    system
}

/// Fragments of the target's host that did not resolve with it
fn unresolved_siblings(container: &Container, target: RevisionId) -> Vec<RevisionId> {
    let host = container
        .wiring(target)
        .map(|w| w.host_or_self())
        .unwrap_or(target);
    let host_revision = container.revision(host);

    container
        .revisions()
        .iter()
        .filter(|r| r.id != target && !container.is_resolved(r.id))
        .filter(|r| match &r.descriptor.fragment_host {
            Some(fragment_host) => {
                let names_host = fragment_host.name == host_revision.name()
                    || (host_revision.is_system() && fragment_host.name == SYSTEM_MODULE_NAME);
                names_host && fragment_host.range.includes(host_revision.version())
            }
            None => false,
        })
        .map(|r| r.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{RejectionReason, RuntimeEnvironment};
    use crate::descriptor::{FragmentHost, PackageImport, RequiredModule};
    use wirex_version::VersionRange;

    fn module(name: &str, version: &str) -> ModuleDescriptor {
        ModuleDescriptor::new(name, Version::parse(version).unwrap())
    }

    fn external(descriptor: ModuleDescriptor) -> ModuleInput {
        ModuleInput::external(Arc::new(descriptor), None)
    }

    fn target(descriptor: ModuleDescriptor) -> ModuleInput {
        ModuleInput::reactor(Arc::new(descriptor), "/reactor/target")
    }

    fn resolver() -> ModuleResolver {
        ModuleResolver::new(ResolverConfig {
            environment: RuntimeEnvironment::new("linux", "gtk", "x86_64", "en_US"),
            profile: Some("JavaSE-17".to_string()),
            ..Default::default()
        })
    }

    fn import(name: &str, range: &str) -> PackageImport {
        PackageImport::new(name).with_range(VersionRange::parse(range).unwrap())
    }

    fn export(name: &str, version: &str) -> PackageExport {
        PackageExport::new(name).with_version(Version::parse(version).unwrap())
    }

    /// Resolves only when uses constraints are enforced
    fn uses_modules() -> (ModuleInput, Vec<ModuleInput>) {
        let modules = vec![
            external(module("a", "1").with_export(export("p", "1").with_uses("q")).with_import(import("q", "[1,2)"))),
            external(module("a", "2").with_export(export("p", "2").with_uses("q")).with_import(import("q", "[2,3)"))),
            external(module("q1", "1").with_export(export("q", "1"))),
            external(module("q2", "1").with_export(export("q", "2"))),
        ];
        let target = target(module("c", "1").with_import(import("p", "[1,3)")).with_import(import("q", "[1,2)")));
        (target, modules)
    }

    #[test]
    fn test_synthetic_system_module_exports_profile_packages() {
        let resolution = resolver()
            .resolve(&target(module("c", "1").with_import(PackageImport::new("javax.xml.parsers"))), &[])
            .unwrap();

        let container = &resolution.container;
        let system = container.revision(container.system_module());
        assert_eq!(system.name(), SYSTEM_MODULE_NAME);
        assert!(system.descriptor.export("javax.crypto").is_some());
        assert_eq!(resolution.attempts, 1);

        let entries = resolution.dependencies(|_| None::<()>).unwrap();
        assert!(entries[0].is_system_module());
    }

    #[test]
    fn test_provided_system_module_is_extended() {
        let provided = module("org.runtime", "4.0")
            .as_system_module()
            .with_export(PackageExport::new("org.runtime.api"));
        let resolution = resolver()
            .resolve(
                &target(
                    module("c", "1")
                        .with_import(PackageImport::new("org.runtime.api"))
                        .with_import(PackageImport::new("javax.sql"))
                        .with_require(RequiredModule::new(SYSTEM_MODULE_NAME)),
                ),
                &[external(provided)],
            )
            .unwrap();

        let container = &resolution.container;
        assert_eq!(container.revision(0).name(), "org.runtime");
        assert_eq!(container.len(), 2);
        assert!(container.is_resolved(resolution.target));
    }

    #[test]
    fn test_unknown_profile_fails_fast() {
        let resolver = ModuleResolver::new(ResolverConfig {
            profile: Some("Nope-1".to_string()),
            ..Default::default()
        });
        let err = resolver.resolve(&target(module("c", "1")), &[]).unwrap_err();
        assert!(matches!(err, ResolverError::UnknownProfile(_)));
    }

    #[test]
    fn test_uses_escalation_retries_exactly_once() {
        let (target, modules) = uses_modules();
        let resolution = resolver().resolve(&target, &modules).unwrap();

        assert_eq!(resolution.attempts, 2);
        assert!(resolution.settings.keep_uses);
        assert_eq!(resolution.settings.escalations, 1);
        let wiring = resolution.container.wiring(resolution.target).unwrap();
        let provider = wiring.package_wire("p").unwrap().provider;
        assert_eq!(resolution.container.revision(provider).identity(), "a_1.0.0");
    }

    #[test]
    fn test_strict_first_attempt_needs_no_retry() {
        let (target, modules) = uses_modules();
        let resolver = ModuleResolver::new(ResolverConfig {
            keep_uses: true,
            ..resolver().config().clone()
        });
        let resolution = resolver.resolve(&target, &modules).unwrap();
        assert_eq!(resolution.attempts, 1);
        assert_eq!(resolution.settings.escalations, 0);
    }

    #[test]
    fn test_unsatisfiable_target_reports_after_escalation() {
        let modules = vec![
            external(module("a", "2").with_export(export("p", "2").with_uses("q")).with_import(import("q", "[2,3)"))),
            external(module("q1", "1").with_export(export("q", "1"))),
            external(module("q2", "1").with_export(export("q", "2"))),
        ];
        let target = target(module("c", "1").with_import(PackageImport::new("p")).with_import(import("q", "[1,2)")));

        let err = resolver().resolve(&target, &modules).unwrap_err();
        let ResolverError::Unresolved(report) = err else {
            panic!("expected an unresolved error");
        };
        assert_eq!(report.attempts, 2);
        assert_eq!(report.module, "c_1.0.0");
        assert_eq!(report.location, Some(PathBuf::from("/reactor/target")));
        assert!(matches!(
            report.unmet[0].candidates[0].reason,
            RejectionReason::UsesConflict { .. }
        ));
        assert!(report.summary().starts_with("Cannot resolve module c_1.0.0"));
    }

    #[test]
    fn test_extra_requirements_widen_resolution() {
        let resolution = resolver()
            .resolve(
                &target(module("c", "1").with_extra_require("helper").with_extra_require("absent")),
                &[external(module("helper", "1"))],
            )
            .unwrap();

        let wiring = resolution.container.wiring(resolution.target).unwrap();
        assert_eq!(wiring.required.len(), 1);
        assert_eq!(resolution.container.revision(wiring.required[0].provider).name(), "helper");
    }

    #[test]
    fn test_reactor_module_overrides_external() {
        let reactor_b = ModuleInput::reactor(Arc::new(module("b", "1")), "/reactor/b");
        let external_b = external(module("b", "9"));
        let resolution = resolver()
            .resolve(
                &target(module("c", "1").with_require(RequiredModule::new("b"))),
                &[external_b, reactor_b],
            )
            .unwrap();

        let container = &resolution.container;
        assert_eq!(container.by_name("b").len(), 1);
        let provider = container.wiring(resolution.target).unwrap().required[0].provider;
        assert_eq!(container.revision(provider).location, Some(PathBuf::from("/reactor/b")));
    }

    #[test]
    fn test_unresolved_fragment_siblings_are_pruned() {
        let modules = vec![
            external(module("good", "1").with_host(FragmentHost::new("c"))),
            external(
                module("bad", "1")
                    .with_host(FragmentHost::new("c"))
                    .with_import(PackageImport::new("missing")),
            ),
        ];
        let resolution = resolver().resolve(&target(module("c", "1")), &modules).unwrap();

        let container = &resolution.container;
        assert_eq!(resolution.attempts, 2);
        assert_eq!(resolution.settings.prunings, 1);
        assert!(container.by_name("bad").is_empty());
        assert_eq!(container.fragments_of(resolution.target).len(), 1);
    }

    #[test]
    fn test_target_duplicate_in_modules_is_ignored() {
        let duplicate = ModuleInput::reactor(Arc::new(module("c", "1")), "/reactor/target");
        let resolution = resolver().resolve(&target(module("c", "1")), &[duplicate]).unwrap();
        assert_eq!(resolution.container.by_name("c"), &[1]);
    }
}
