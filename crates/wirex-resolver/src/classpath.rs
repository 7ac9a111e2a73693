//! Classpath assembly from computed dependency entries.

use std::path::PathBuf;

use serde::Serialize;

use crate::visibility::{AccessRule, DependencyEntry};

/// One location on the compile classpath with its access rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClasspathEntry {
    pub location: PathBuf,
    /// `None` grants unrestricted access
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<AccessRule>>,
}

/// Turn dependency entries into classpath entries, keeping their order.
///
/// The system module is skipped (it is on the boot classpath), as are
/// entries without a location.
pub fn assemble<A>(entries: &[DependencyEntry<A>]) -> Vec<ClasspathEntry> {
    entries
        .iter()
        .filter(|entry| !entry.is_system_module())
        .filter_map(|entry| {
            entry.location().map(|location| ClasspathEntry {
                location: location.to_path_buf(),
                rules: entry.rules.clone(),
            })
        })
        .collect()
}
