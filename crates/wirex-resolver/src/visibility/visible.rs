//! Per-consumer visible package sets.

use indexmap::{IndexMap, IndexSet};

use crate::container::{Container, RevisionId};

use super::AccessRule;

/// Access rules one consumer holds, grouped by exporting revision.
///
/// Rules accumulate: a package reachable through two paths keeps every
/// rule it was granted. Fragments share the entry of their host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisiblePackages {
    rules: IndexMap<RevisionId, IndexSet<AccessRule>>,
}

impl VisiblePackages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rule; returns whether it was new
    pub fn add(&mut self, exporter: RevisionId, rule: AccessRule) -> bool {
        self.rules.entry(exporter).or_default().insert(rule)
    }

    pub fn get(&self, exporter: RevisionId) -> Option<&IndexSet<AccessRule>> {
        self.rules.get(&exporter)
    }

    /// Exporting revisions in discovery order
    pub fn exporters(&self) -> impl Iterator<Item = RevisionId> + '_ {
        self.rules.keys().copied()
    }

    /// Rules to attach to an entry for `revision`: those of its host when it
    /// is a fragment, its own otherwise
    pub fn inclusions(&self, container: &Container, revision: RevisionId) -> Vec<AccessRule> {
        let key = container
            .wiring(revision)
            .map(|w| w.host_or_self())
            .unwrap_or(revision);
        self.rules
            .get(&key)
            .map(|rules| rules.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
