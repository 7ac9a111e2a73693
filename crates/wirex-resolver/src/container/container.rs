use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use wirex_version::Version;

use crate::descriptor::ModuleDescriptor;

use super::{RuntimeEnvironment, SystemCapabilities, UnmetRequirement, Wiring};

/// Index of a revision inside its container.
pub type RevisionId = usize;

/// Name every container answers for the system module, whatever its real
/// symbolic name is
pub const SYSTEM_MODULE_NAME: &str = "system.bundle";

/// Where an installed module comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleOrigin {
    /// The synthetic or provided runtime module
    System,
    /// A module built in the current reactor
    Reactor,
    /// A module provided by the target platform or a repository
    External,
}

/// One installed module.
#[derive(Debug, Clone)]
pub struct ModuleRevision {
    pub id: RevisionId,
    pub descriptor: Arc<ModuleDescriptor>,
    pub location: Option<PathBuf>,
    pub origin: ModuleOrigin,
}

impl ModuleRevision {
    pub fn name(&self) -> &str {
        &self.descriptor.symbolic_name
    }

    pub fn version(&self) -> &Version {
        &self.descriptor.version
    }

    pub fn identity(&self) -> String {
        self.descriptor.identity()
    }

    pub fn is_fragment(&self) -> bool {
        self.descriptor.is_fragment()
    }

    pub fn is_system(&self) -> bool {
        self.origin == ModuleOrigin::System
    }
}

/// Lifecycle of a revision within one resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionState {
    Installed,
    Resolving,
    Resolved,
    Unresolved,
}

/// The full revision set of one resolution attempt.
///
/// The system module is always revision `0`. A container is resolved at
/// most once; retries build a fresh one.
#[derive(Debug)]
pub struct Container {
    pub(crate) revisions: Vec<ModuleRevision>,
    by_name: HashMap<String, Vec<RevisionId>>,
    by_location: HashMap<PathBuf, RevisionId>,
    pub(crate) states: Vec<RevisionState>,
    pub(crate) wirings: Vec<Option<Wiring>>,
    pub(crate) unmet: Vec<Vec<UnmetRequirement>>,
    pub(crate) environment: RuntimeEnvironment,
    pub(crate) capabilities: SystemCapabilities,
}

impl Container {
    /// Create a container holding only the system module
    pub fn new(
        environment: RuntimeEnvironment,
        capabilities: SystemCapabilities,
        system: Arc<ModuleDescriptor>,
        system_location: Option<PathBuf>,
    ) -> Self {
        let mut container = Self {
            revisions: Vec::new(),
            by_name: HashMap::new(),
            by_location: HashMap::new(),
            states: Vec::new(),
            wirings: Vec::new(),
            unmet: Vec::new(),
            environment,
            capabilities,
        };
        container.install(system, system_location, ModuleOrigin::System);
        if container.revisions[0].name() != SYSTEM_MODULE_NAME {
            container
                .by_name
                .entry(SYSTEM_MODULE_NAME.to_string())
                .or_default()
                .push(0);
        }
        container
    }

    /// Install a module as an independent revision
    pub fn install(
        &mut self,
        descriptor: Arc<ModuleDescriptor>,
        location: Option<PathBuf>,
        origin: ModuleOrigin,
    ) -> RevisionId {
        let id = self.revisions.len();
        self.by_name
            .entry(descriptor.symbolic_name.clone())
            .or_default()
            .push(id);
        if let Some(location) = &location {
            self.by_location.insert(location.clone(), id);
        }
        self.revisions.push(ModuleRevision {
            id,
            descriptor,
            location,
            origin,
        });
        self.states.push(RevisionState::Installed);
        self.wirings.push(None);
        self.unmet.push(Vec::new());
        id
    }

    /// # Panics
    ///
    /// Panics if `id` was not handed out by this container.
    pub fn revision(&self, id: RevisionId) -> &ModuleRevision {
        &self.revisions[id]
    }

    pub fn revisions(&self) -> &[ModuleRevision] {
        &self.revisions
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// Revisions installed under `name`, in installation order
    pub fn by_name(&self, name: &str) -> &[RevisionId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn by_location(&self, location: &Path) -> Option<RevisionId> {
        self.by_location.get(location).copied()
    }

    pub fn system_module(&self) -> RevisionId {
        0
    }

    pub fn environment(&self) -> &RuntimeEnvironment {
        &self.environment
    }

    pub fn capabilities(&self) -> &SystemCapabilities {
        &self.capabilities
    }

    pub fn state(&self, id: RevisionId) -> RevisionState {
        self.states[id]
    }

    pub fn is_resolved(&self, id: RevisionId) -> bool {
        self.states[id] == RevisionState::Resolved
    }

    /// The wiring of a resolved revision
    pub fn wiring(&self, id: RevisionId) -> Option<&Wiring> {
        self.wirings.get(id).and_then(Option::as_ref)
    }

    pub fn unmet_requirements(&self, id: RevisionId) -> &[UnmetRequirement] {
        &self.unmet[id]
    }

    /// Fragments attached to a resolved host
    pub fn fragments_of(&self, host: RevisionId) -> &[RevisionId] {
        self.wiring(host).map(|w| w.fragments.as_slice()).unwrap_or(&[])
    }

    /// Dump every revision with its resolution state, location and unmet
    /// requirements
    pub fn debug_string(&self) -> String {
        let mut out = String::new();
        for revision in &self.revisions {
            let state = if self.is_resolved(revision.id) {
                "RESOLVED"
            } else {
                "NOT RESOLVED"
            };
            let location = revision
                .location
                .as_ref()
                .map(|l| l.display().to_string())
                .unwrap_or_else(|| "<no location>".to_string());
            let _ = writeln!(out, "{} {} {}", state, revision.identity(), location);
            for unmet in &self.unmet[revision.id] {
                let _ = writeln!(out, "\t{}", unmet);
                for candidate in &unmet.candidates {
                    let _ = writeln!(out, "\t\t{}: {}", candidate.candidate, candidate.reason);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system() -> Arc<ModuleDescriptor> {
        Arc::new(ModuleDescriptor::new("org.runtime.core", Version::new(3, 0, 0)))
    }

    #[test]
    fn test_system_module_alias() {
        let container = Container::new(
            RuntimeEnvironment::new("linux", "gtk", "x86_64", "en_US"),
            SystemCapabilities::default(),
            system(),
            None,
        );
        assert_eq!(container.system_module(), 0);
        assert_eq!(container.by_name(SYSTEM_MODULE_NAME), &[0]);
        assert_eq!(container.by_name("org.runtime.core"), &[0]);
        assert!(container.revision(0).is_system());
    }

    #[test]
    fn test_install_indexes_by_name_and_location() {
        let mut container = Container::new(
            RuntimeEnvironment::new("linux", "gtk", "x86_64", "en_US"),
            SystemCapabilities::default(),
            system(),
            None,
        );
        let a = container.install(
            Arc::new(ModuleDescriptor::new("a", Version::new(1, 0, 0))),
            Some(PathBuf::from("/repo/a")),
            ModuleOrigin::Reactor,
        );
        assert_eq!(a, 1);
        assert_eq!(container.by_name("a"), &[1]);
        assert_eq!(container.by_location(Path::new("/repo/a")), Some(1));
        assert_eq!(container.state(a), RevisionState::Installed);
        assert!(container.wiring(a).is_none());
        assert!(container.by_name("missing").is_empty());
    }

    #[test]
    fn test_debug_string_lists_all_revisions() {
        let mut container = Container::new(
            RuntimeEnvironment::new("linux", "gtk", "x86_64", "en_US"),
            SystemCapabilities::default(),
            system(),
            None,
        );
        container.install(
            Arc::new(ModuleDescriptor::new("a", Version::new(1, 0, 0))),
            Some(PathBuf::from("/repo/a")),
            ModuleOrigin::Reactor,
        );
        let dump = container.debug_string();
        assert!(dump.contains("NOT RESOLVED org.runtime.core_3.0.0 <no location>"));
        assert!(dump.contains("NOT RESOLVED a_1.0.0 /repo/a"));
    }
}
