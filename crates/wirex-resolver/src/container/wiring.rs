use crate::descriptor::{PackageExport, PackageImport, RequiredModule};

use super::RevisionId;

/// A resolved required-module requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleWire {
    /// The host revision satisfying the requirement
    pub provider: RevisionId,
    /// Whether the provider's packages are forwarded to the requirer's consumers
    pub reexport: bool,
    pub requirement: RequiredModule,
    /// The revision that declared the requirement (the host or one of its fragments)
    pub declared_by: RevisionId,
}

/// A resolved package import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageWire {
    pub package: String,
    /// The host revision whose wiring carries the export
    pub provider: RevisionId,
    /// The revision that declared the export; differs from `provider` when a
    /// fragment contributed it
    pub exported_by: RevisionId,
    pub export: PackageExport,
    pub requirement: PackageImport,
    /// The revision that declared the import
    pub declared_by: RevisionId,
}

/// A package capability offered by a resolved host, including packages
/// contributed by attached fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedPackage {
    pub declared_by: RevisionId,
    pub export: PackageExport,
}

/// Resolved requirement-to-capability edges of one revision.
///
/// A host carries its own and its fragments' wires. A fragment carries only
/// the wire to its host; everything else it declared lives in the host's
/// wiring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wiring {
    pub revision: RevisionId,
    /// Set for fragments only
    pub host: Option<RevisionId>,
    /// Attached fragments, in installation order
    pub fragments: Vec<RevisionId>,
    pub required: Vec<ModuleWire>,
    pub packages: Vec<PackageWire>,
    pub exports: Vec<ExportedPackage>,
}

impl Wiring {
    pub fn for_host(revision: RevisionId) -> Self {
        Self {
            revision,
            ..Default::default()
        }
    }

    pub fn for_fragment(revision: RevisionId, host: RevisionId) -> Self {
        Self {
            revision,
            host: Some(host),
            ..Default::default()
        }
    }

    pub fn is_fragment(&self) -> bool {
        self.host.is_some()
    }

    /// The revision whose wiring holds this revision's effective wires
    pub fn host_or_self(&self) -> RevisionId {
        self.host.unwrap_or(self.revision)
    }

    pub fn package_wire(&self, package: &str) -> Option<&PackageWire> {
        self.packages.iter().find(|w| w.package == package)
    }

    pub fn exported(&self, package: &str) -> Option<&ExportedPackage> {
        self.exports.iter().find(|e| e.export.name == package)
    }

    /// Where a consumer of this wiring obtains `package`: the import wire's
    /// provider, else this revision when it exports the package itself.
    pub fn source_of(&self, package: &str) -> Option<RevisionId> {
        match self.package_wire(package) {
            Some(wire) => Some(wire.provider),
            None => self.exported(package).map(|_| self.revision),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_prefers_import_wire() {
        let mut wiring = Wiring::for_host(3);
        wiring.exports.push(ExportedPackage {
            declared_by: 3,
            export: PackageExport::new("p"),
        });
        assert_eq!(wiring.source_of("p"), Some(3));
        assert_eq!(wiring.source_of("q"), None);

        wiring.packages.push(PackageWire {
            package: "p".to_string(),
            provider: 7,
            exported_by: 8,
            export: PackageExport::new("p"),
            requirement: PackageImport::new("p"),
            declared_by: 3,
        });
        assert_eq!(wiring.source_of("p"), Some(7));
    }

    #[test]
    fn test_fragment_wiring() {
        let wiring = Wiring::for_fragment(5, 2);
        assert!(wiring.is_fragment());
        assert_eq!(wiring.host_or_self(), 2);
        assert_eq!(Wiring::for_host(4).host_or_self(), 4);
    }
}
