use std::cmp::Ordering;

use super::{Container, ModuleOrigin, RevisionId};

/// Policy for selecting between candidate providers.
///
/// When several revisions can satisfy a requirement the policy decides
/// which one is tried first: the highest version wins, then a module of the
/// build reactor over an external one, then the earlier installation.
#[derive(Debug, Clone, Default)]
pub struct Policy;

impl Policy {
    pub fn new() -> Self {
        Self
    }

    /// Sort candidate revisions by preference (best first)
    pub fn select_preferred(&self, container: &Container, candidates: &[RevisionId]) -> Vec<RevisionId> {
        let mut sorted = candidates.to_vec();
        sorted.sort_by(|&a, &b| self.compare_revisions(container, a, b));
        sorted
    }

    pub fn select_best(&self, container: &Container, candidates: &[RevisionId]) -> Option<RevisionId> {
        self.select_preferred(container, candidates).into_iter().next()
    }

    /// Order two revisions, `Less` meaning `a` is preferred
    pub fn compare_revisions(&self, container: &Container, a: RevisionId, b: RevisionId) -> Ordering {
        let ra = container.revision(a);
        let rb = container.revision(b);
        rb.version()
            .cmp(ra.version())
            .then_with(|| origin_rank(ra.origin).cmp(&origin_rank(rb.origin)))
            .then_with(|| a.cmp(&b))
    }

    /// Order two package exports, `Less` meaning the first is preferred.
    ///
    /// The export version dominates; ties fall back to the providers' order.
    pub fn compare_exports(
        &self,
        container: &Container,
        a: (RevisionId, &wirex_version::Version),
        b: (RevisionId, &wirex_version::Version),
    ) -> Ordering {
        b.1.cmp(a.1)
            .then_with(|| self.compare_revisions(container, a.0, b.0))
    }
}

fn origin_rank(origin: ModuleOrigin) -> u8 {
    match origin {
        ModuleOrigin::Reactor => 0,
        ModuleOrigin::System => 1,
        ModuleOrigin::External => 2,
    }
}
