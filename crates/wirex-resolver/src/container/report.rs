//! Diagnostics for modules that could not be resolved.
//!
//! Reports are self-contained: they name revisions by identity rather than
//! by id so they outlive the container that produced them.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use wirex_version::{Version, VersionRange};

use super::{Container, RevisionId};

/// Kind of requirement that could not be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementKind {
    Import,
    Require,
    Host,
    ExecutionEnvironment,
    PlatformFilter,
}

impl RequirementKind {
    fn label(&self) -> &'static str {
        match self {
            RequirementKind::Import => "Import-Package",
            RequirementKind::Require => "Require-Module",
            RequirementKind::Host => "Fragment-Host",
            RequirementKind::ExecutionEnvironment => "Execution-Environment",
            RequirementKind::PlatformFilter => "Platform-Filter",
        }
    }
}

/// Why a considered candidate was not chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    VersionMismatch { found: Version, range: VersionRange },
    FilterMismatch(String),
    /// The candidate could not be resolved itself
    Unresolved,
    /// Choosing the candidate would make the consumer see `package` from two
    /// different sources
    UsesConflict {
        package: String,
        expected: String,
        actual: String,
    },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::VersionMismatch { found, range } => {
                write!(f, "version {} is outside {}", found, range)
            }
            RejectionReason::FilterMismatch(detail) => write!(f, "filter mismatch: {}", detail),
            RejectionReason::Unresolved => write!(f, "candidate is not resolved"),
            RejectionReason::UsesConflict { package, expected, actual } => write!(
                f,
                "uses constraint violated for package {}: provider expects {} but consumer is wired to {}",
                package, expected, actual
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedCandidate {
    /// `name_version` of the candidate
    pub candidate: String,
    pub reason: RejectionReason,
}

/// One unsatisfied requirement and every candidate considered for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmetRequirement {
    pub kind: RequirementKind,
    pub name: String,
    pub range: Option<VersionRange>,
    /// `name_version` of the declaring revision
    pub declared_by: String,
    pub candidates: Vec<RejectedCandidate>,
}

impl UnmetRequirement {
    pub fn new(kind: RequirementKind, name: impl Into<String>, declared_by: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            range: None,
            declared_by: declared_by.into(),
            candidates: Vec::new(),
        }
    }

    pub fn with_range(mut self, range: VersionRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_candidate(mut self, candidate: impl Into<String>, reason: RejectionReason) -> Self {
        self.candidates.push(RejectedCandidate {
            candidate: candidate.into(),
            reason,
        });
        self
    }

    /// The requirement names another module whose own failures are relevant
    pub fn names_module(&self) -> bool {
        matches!(self.kind, RequirementKind::Require | RequirementKind::Host)
    }
}

impl fmt::Display for UnmetRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: missing {} {}", self.declared_by, self.kind.label(), self.name)?;
        if let Some(range) = self.range.as_ref().filter(|r| !r.is_any()) {
            write!(f, " {}", range)?;
        }
        Ok(())
    }
}

/// Structured failure report for one module.
///
/// Rendered in two tiers: [`summary`](Self::summary) is a single line fit
/// for a warning, [`detail`](Self::detail) lists every unmet requirement
/// with its rejected candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionReport {
    pub module: String,
    pub location: Option<PathBuf>,
    pub attempts: u32,
    /// The module's own unmet requirements followed by relevant failures of
    /// the modules they name
    pub unmet: Vec<UnmetRequirement>,
    /// Resolver state dump of the failed attempt
    pub state: String,
}

impl ResolutionReport {
    pub fn summary(&self) -> String {
        let location = self
            .location
            .as_ref()
            .map(|l| format!(" ({})", l.display()))
            .unwrap_or_default();
        match self.unmet.first() {
            Some(first) if self.unmet.len() > 1 => format!(
                "Cannot resolve module {}{}: {} (and {} more)",
                self.module,
                location,
                first,
                self.unmet.len() - 1
            ),
            Some(first) => format!("Cannot resolve module {}{}: {}", self.module, location, first),
            None => format!("Cannot resolve module {}{}", self.module, location),
        }
    }

    pub fn detail(&self) -> String {
        let mut out = format!(
            "Resolution of {} failed after {} attempt(s)\n",
            self.module, self.attempts
        );
        for unmet in &self.unmet {
            out.push_str(&format!("  {}\n", unmet));
            if unmet.candidates.is_empty() {
                out.push_str("    no candidates\n");
            }
            for candidate in &unmet.candidates {
                out.push_str(&format!("    rejected {}: {}\n", candidate.candidate, candidate.reason));
            }
        }
        out
    }
}

impl Container {
    /// Build the failure report for `id`.
    ///
    /// Besides the module's own unmet requirements, the failures of every
    /// unresolved module named by an unmet require-module or fragment-host
    /// requirement are included, recursively.
    pub fn failure_report(&self, id: RevisionId, attempts: u32) -> ResolutionReport {
        let revision = self.revision(id);
        let mut unmet = Vec::new();
        let mut visited: HashSet<RevisionId> = HashSet::new();
        self.collect_relevant(id, &mut visited, &mut unmet);

        ResolutionReport {
            module: revision.identity(),
            location: revision.location.clone(),
            attempts,
            unmet,
            state: self.debug_string(),
        }
    }

    fn collect_relevant(&self, id: RevisionId, visited: &mut HashSet<RevisionId>, out: &mut Vec<UnmetRequirement>) {
        if !visited.insert(id) {
            return;
        }
        let own = self.unmet_requirements(id);
        out.extend(own.iter().cloned());
        for requirement in own.iter().filter(|u| u.names_module()) {
            for &named in self.by_name(&requirement.name) {
                if !self.is_resolved(named) {
                    self.collect_relevant(named, visited, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ResolutionReport {
        ResolutionReport {
            module: "c_1.0.0".to_string(),
            location: Some(PathBuf::from("/build/c")),
            attempts: 2,
            unmet: vec![
                UnmetRequirement::new(RequirementKind::Import, "p", "c_1.0.0")
                    .with_range(VersionRange::parse("[1,2)").unwrap())
                    .with_candidate(
                        "a_2.0.0",
                        RejectionReason::VersionMismatch {
                            found: Version::new(2, 0, 0),
                            range: VersionRange::parse("[1,2)").unwrap(),
                        },
                    ),
                UnmetRequirement::new(RequirementKind::Require, "b", "c_1.0.0"),
            ],
            state: String::new(),
        }
    }

    #[test]
    fn test_summary_is_single_line() {
        let summary = report().summary();
        assert!(!summary.contains('\n'));
        assert!(summary.starts_with("Cannot resolve module c_1.0.0 (/build/c)"));
        assert!(summary.contains("missing Import-Package p [1.0.0,2.0.0)"));
        assert!(summary.ends_with("(and 1 more)"));
    }

    #[test]
    fn test_detail_lists_candidates() {
        let detail = report().detail();
        assert!(detail.contains("after 2 attempt(s)"));
        assert!(detail.contains("rejected a_2.0.0: version 2.0.0 is outside [1.0.0,2.0.0)"));
        assert!(detail.contains("c_1.0.0: missing Require-Module b\n    no candidates"));
    }
}
