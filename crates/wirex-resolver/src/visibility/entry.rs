//! Dependency entries produced by the walk.

use std::path::{Path, PathBuf};

use crate::container::{ModuleOrigin, ModuleRevision, RevisionId};

use super::AccessRule;

/// What a dependency entry points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// The runtime module; its classes come from the boot classpath
    SystemModule,
    /// A module built in the current reactor
    ReactorModule(PathBuf),
    /// A module provided from outside the build, possibly without a location
    ExternalModule(Option<PathBuf>),
}

impl EntryKind {
    /// A reactor revision without a location is treated as external
    pub fn of(revision: &ModuleRevision) -> Self {
        match (revision.origin, &revision.location) {
            (ModuleOrigin::System, _) => EntryKind::SystemModule,
            (ModuleOrigin::Reactor, Some(location)) => EntryKind::ReactorModule(location.clone()),
            (_, location) => EntryKind::ExternalModule(location.clone()),
        }
    }

    pub fn location(&self) -> Option<&Path> {
        match self {
            EntryKind::SystemModule => None,
            EntryKind::ReactorModule(location) => Some(location),
            EntryKind::ExternalModule(location) => location.as_deref(),
        }
    }
}

/// One module the consumer may compile against.
///
/// `rules` is `None` when access is unrestricted (a fragment's host). The
/// artifact is whatever the caller's lookup returned for the revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEntry<A = ()> {
    pub revision: RevisionId,
    /// `name_version` of the revision
    pub identity: String,
    pub kind: EntryKind,
    pub rules: Option<Vec<AccessRule>>,
    pub artifact: Option<A>,
}

impl<A> DependencyEntry<A> {
    pub fn is_system_module(&self) -> bool {
        self.kind == EntryKind::SystemModule
    }

    pub fn location(&self) -> Option<&Path> {
        self.kind.location()
    }
}
