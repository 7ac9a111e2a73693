//! "Uses" consistency of package wires.
//!
//! For a wire `consumer -> provider` of package `p`, every package `q` named
//! in the `uses` of the provider's export of `p` must reach the consumer
//! from the same source the provider sees it from.

use log::debug;

use crate::descriptor::PackageImport;

use super::resolve::{ExportCandidate, Requirement, ResolveState};
use super::{PackageWire, RejectionReason, RequirementKind, RevisionId, UnmetRequirement};

/// Upper bound on provider combinations tried when repairing one module
const MAX_REPAIR_STEPS: usize = 4096;

/// Two sources of the same package reaching one consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct UsesConflict {
    /// Index of the offending wire in the consumer's package wires
    pub wire: usize,
    pub package: String,
    pub expected: RevisionId,
    pub actual: RevisionId,
}

impl<'a> ResolveState<'a> {
    /// Where `revision` obtains `package` given a candidate set of import wires
    fn source_with(&self, revision: RevisionId, packages: &[PackageWire], package: &str) -> Option<RevisionId> {
        match packages.iter().find(|w| w.package == package) {
            Some(wire) => Some(wire.provider),
            None => self.wirings[revision]
                .as_ref()
                .and_then(|w| w.exported(package))
                .map(|_| revision),
        }
    }

    /// First uses conflict of `consumer` if it were wired with `packages`
    pub(super) fn uses_conflict(&self, consumer: RevisionId, packages: &[PackageWire]) -> Option<UsesConflict> {
        for (index, wire) in packages.iter().enumerate() {
            let Some(provider) = self.wirings[wire.provider].as_ref() else {
                continue;
            };
            for used in &wire.export.uses {
                let expected = provider.source_of(used);
                let actual = self.source_with(consumer, packages, used);
                if let (Some(expected), Some(actual)) = (expected, actual) {
                    if expected != actual {
                        return Some(UsesConflict {
                            wire: index,
                            package: used.clone(),
                            expected,
                            actual,
                        });
                    }
                }
            }
        }
        None
    }

    fn conflict_of(&self, host: RevisionId) -> Option<UsesConflict> {
        let wiring = self.wirings[host].as_ref()?;
        self.uses_conflict(host, &wiring.packages)
    }

    fn fail_conflict(&mut self, host: RevisionId, conflict: UsesConflict) {
        let Some(wire) = self.wirings[host]
            .as_ref()
            .and_then(|w| w.packages.get(conflict.wire))
            .cloned()
        else {
            return;
        };
        let unmet = UnmetRequirement::new(RequirementKind::Import, &wire.package, self.identity(wire.declared_by))
            .with_range(wire.requirement.range.clone())
            .with_candidate(
                self.identity(wire.exported_by),
                RejectionReason::UsesConflict {
                    package: conflict.package,
                    expected: self.identity(conflict.expected),
                    actual: self.identity(conflict.actual),
                },
            );
        self.fail(host, unmet);
    }

    /// Relaxed mode: check only the target's host. Returns whether it failed.
    pub(super) fn validate_target_uses(&mut self, target: RevisionId) -> bool {
        let host = self.hosts[target].unwrap_or(target);
        if !self.eligible[host] {
            return false;
        }
        match self.conflict_of(host) {
            Some(conflict) => {
                debug!(
                    "{} violates a uses constraint on {}",
                    self.identity(host),
                    conflict.package
                );
                self.fail_conflict(host, conflict);
                true
            }
            None => false,
        }
    }

    /// Strict mode: check every host, repairing conflicts where another
    /// provider choice is consistent. Returns whether any module failed.
    pub(super) fn enforce_uses(&mut self) -> bool {
        let hosts: Vec<RevisionId> = (0..self.eligible.len())
            .filter(|&id| self.eligible[id] && !self.container.revision(id).is_fragment())
            .collect();

        for _round in 0..=hosts.len() {
            let mut changed = false;
            let mut failed = false;

            for &host in &hosts {
                if !self.eligible[host] {
                    continue;
                }
                let Some(conflict) = self.conflict_of(host) else {
                    continue;
                };
                match self.repair(host) {
                    Some(packages) => {
                        debug!("Rewired {} to satisfy uses constraints", self.identity(host));
                        if let Some(wiring) = self.wirings[host].as_mut() {
                            wiring.packages = packages;
                        }
                        changed = true;
                    }
                    None => {
                        self.fail_conflict(host, conflict);
                        failed = true;
                    }
                }
            }

            if failed {
                return true;
            }
            if !changed {
                return false;
            }
        }

        // Repairs kept invalidating each other; whatever still conflicts fails
        let mut failed = false;
        for host in hosts {
            if let Some(conflict) = self.conflict_of(host) {
                self.fail_conflict(host, conflict);
                failed = true;
            }
        }
        failed
    }

    /// Search alternative providers for the host's imports, in preference
    /// order, for a combination without uses conflicts
    fn repair(&self, host: RevisionId) -> Option<Vec<PackageWire>> {
        let mut seen: Vec<&str> = Vec::new();
        let mut slots: Vec<(RevisionId, &'a PackageImport, Vec<Option<ExportCandidate<'a>>>)> = Vec::new();

        for (declared_by, requirement) in self.requirements_of(host) {
            let Requirement::Import(import) = requirement else {
                continue;
            };
            if seen.contains(&import.name.as_str()) {
                continue;
            }
            seen.push(import.name.as_str());

            let mut options: Vec<Option<ExportCandidate<'a>>> = Vec::new();
            for candidate in self.import_providers(host, import) {
                if candidate.provider == host {
                    options.push(None);
                    break;
                }
                options.push(Some(candidate));
            }
            if options.is_empty() {
                options.push(None);
            }
            slots.push((declared_by, import, options));
        }

        let mut choice = vec![0usize; slots.len()];
        for _ in 0..MAX_REPAIR_STEPS {
            let packages: Vec<PackageWire> = slots
                .iter()
                .zip(&choice)
                .filter_map(|((declared_by, import, options), &i)| {
                    options[i].map(|c| PackageWire {
                        package: import.name.clone(),
                        provider: c.provider,
                        exported_by: c.exported_by,
                        export: c.export.clone(),
                        requirement: PackageImport::clone(import),
                        declared_by: *declared_by,
                    })
                })
                .collect();
            if self.uses_conflict(host, &packages).is_none() {
                return Some(packages);
            }

            // Advance the rightmost slot that still has alternatives
            let mut slot = choice.len();
            loop {
                if slot == 0 {
                    return None;
                }
                slot -= 1;
                if choice[slot] + 1 < slots[slot].2.len() {
                    choice[slot] += 1;
                    for later in choice.iter_mut().skip(slot + 1) {
                        *later = 0;
                    }
                    break;
                }
            }
        }
        None
    }
}
