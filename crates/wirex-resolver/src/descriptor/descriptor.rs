use std::fmt;

use indexmap::IndexMap;
use wirex_version::{Version, VersionRange};

use super::PlatformFilter;

/// Directive marking a package as internal to its exporter
pub const INTERNAL_DIRECTIVE: &str = "x-internal";

/// Directive listing the only modules allowed unrestricted access to a package
pub const FRIENDS_DIRECTIVE: &str = "x-friends";

/// An exported package capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageExport {
    /// Package name (e.g. `org.example.api`)
    pub name: String,
    /// Version the package is exported at
    pub version: Version,
    /// Matching attributes
    pub attributes: IndexMap<String, String>,
    /// Directives such as `x-internal` and `x-friends`
    pub directives: IndexMap<String, String>,
    /// Packages whose providers must agree with this export's consumers
    pub uses: Vec<String>,
}

impl PackageExport {
    /// Create an export at version `0.0.0`
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Version::empty(),
            attributes: IndexMap::new(),
            directives: IndexMap::new(),
            uses: Vec::new(),
        }
    }

    /// Set the exported version
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Add a directive
    pub fn with_directive(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.directives.insert(key.into(), value.into());
        self
    }

    /// Add a package to the `uses` list
    pub fn with_uses(mut self, package: impl Into<String>) -> Self {
        self.uses.push(package.into());
        self
    }

    /// Whether the package carries `x-internal=true`
    pub fn is_internal(&self) -> bool {
        self.directives
            .get(INTERNAL_DIRECTIVE)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// The `x-friends` list, if declared
    pub fn friends(&self) -> Option<Vec<&str>> {
        self.directives
            .get(FRIENDS_DIRECTIVE)
            .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
    }
}

/// An imported package requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageImport {
    pub name: String,
    pub range: VersionRange,
    pub optional: bool,
}

impl PackageImport {
    /// Create a mandatory import accepting any version
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: VersionRange::any(),
            optional: false,
        }
    }

    pub fn with_range(mut self, range: VersionRange) -> Self {
        self.range = range;
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }
}

/// A required-module requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredModule {
    pub name: String,
    pub range: VersionRange,
    /// Forward the required module's packages to this module's own consumers
    pub reexport: bool,
    pub optional: bool,
}

impl RequiredModule {
    /// Create a mandatory, non re-exported requirement accepting any version
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: VersionRange::any(),
            reexport: false,
            optional: false,
        }
    }

    pub fn with_range(mut self, range: VersionRange) -> Self {
        self.range = range;
        self
    }

    pub fn reexport(mut self, reexport: bool) -> Self {
        self.reexport = reexport;
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }
}

/// Kind of extension a fragment contributes to the system module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    Framework,
    BootClasspath,
}

/// The host a fragment attaches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentHost {
    pub name: String,
    pub range: VersionRange,
    pub extension: Option<ExtensionKind>,
}

impl FragmentHost {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: VersionRange::any(),
            extension: None,
        }
    }

    pub fn with_range(mut self, range: VersionRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_extension(mut self, extension: ExtensionKind) -> Self {
        self.extension = Some(extension);
        self
    }
}

/// Immutable per-module fact sheet.
///
/// Created once per module location and shared through an `Arc`; the
/// resolver never mutates a descriptor, it derives new ones when it needs
/// to widen the requirements (see [`ModuleDescriptor::with_extra_requirements`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub symbolic_name: String,
    pub version: Version,
    pub exports: Vec<PackageExport>,
    pub imports: Vec<PackageImport>,
    pub requires: Vec<RequiredModule>,
    pub fragment_host: Option<FragmentHost>,
    /// Module names required through an out-of-band directive
    pub extra_requires: Vec<String>,
    /// Execution environments this module can run on (any one suffices)
    pub execution_environments: Vec<String>,
    pub platform_filter: Option<PlatformFilter>,
    /// The module already provides the runtime-module identity
    pub system_module: bool,
}

impl ModuleDescriptor {
    /// Create a descriptor with no capabilities or requirements
    pub fn new(symbolic_name: impl Into<String>, version: Version) -> Self {
        Self {
            symbolic_name: symbolic_name.into(),
            version,
            exports: Vec::new(),
            imports: Vec::new(),
            requires: Vec::new(),
            fragment_host: None,
            extra_requires: Vec::new(),
            execution_environments: Vec::new(),
            platform_filter: None,
            system_module: false,
        }
    }

    pub fn with_export(mut self, export: PackageExport) -> Self {
        self.exports.push(export);
        self
    }

    pub fn with_import(mut self, import: PackageImport) -> Self {
        self.imports.push(import);
        self
    }

    pub fn with_require(mut self, require: RequiredModule) -> Self {
        self.requires.push(require);
        self
    }

    pub fn with_host(mut self, host: FragmentHost) -> Self {
        self.fragment_host = Some(host);
        self
    }

    pub fn with_extra_require(mut self, name: impl Into<String>) -> Self {
        self.extra_requires.push(name.into());
        self
    }

    pub fn with_execution_environment(mut self, name: impl Into<String>) -> Self {
        self.execution_environments.push(name.into());
        self
    }

    pub fn with_platform_filter(mut self, filter: PlatformFilter) -> Self {
        self.platform_filter = Some(filter);
        self
    }

    pub fn as_system_module(mut self) -> Self {
        self.system_module = true;
        self
    }

    /// Whether this module is a fragment
    pub fn is_fragment(&self) -> bool {
        self.fragment_host.is_some()
    }

    /// Whether this module is a framework extension fragment
    pub fn is_framework_extension(&self) -> bool {
        matches!(
            &self.fragment_host,
            Some(FragmentHost { extension: Some(ExtensionKind::Framework), .. })
        )
    }

    /// `symbolic-name_version`, the identity used for stable ordering and reports
    pub fn identity(&self) -> String {
        format!("{}_{}", self.symbolic_name, self.version)
    }

    /// Find an export by package name
    pub fn export(&self, package: &str) -> Option<&PackageExport> {
        self.exports.iter().find(|e| e.name == package)
    }

    /// Derive a descriptor whose out-of-band extra requirements are appended
    /// as optional required-module requirements.
    ///
    /// Names already required explicitly are not added twice.
    pub fn with_extra_requirements(&self) -> Self {
        let mut derived = self.clone();
        for name in &self.extra_requires {
            if derived.requires.iter().any(|r| &r.name == name) {
                continue;
            }
            derived.requires.push(RequiredModule::new(name.clone()).optional(true));
        }
        derived
    }
}

impl fmt::Display for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.symbolic_name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_directive() {
        let export = PackageExport::new("a.internal").with_directive("x-internal", "true");
        assert!(export.is_internal());

        let export = PackageExport::new("a.api").with_directive("x-internal", "false");
        assert!(!export.is_internal());
        assert!(!PackageExport::new("a.api").is_internal());
    }

    #[test]
    fn test_friends_directive() {
        let export = PackageExport::new("a.impl").with_directive("x-friends", "b, c ,");
        assert_eq!(export.friends(), Some(vec!["b", "c"]));
        assert_eq!(PackageExport::new("a.api").friends(), None);
    }

    #[test]
    fn test_extra_requirements_are_optional() {
        let descriptor = ModuleDescriptor::new("a", Version::new(1, 0, 0))
            .with_require(RequiredModule::new("b"))
            .with_extra_require("b")
            .with_extra_require("c");

        let derived = descriptor.with_extra_requirements();
        assert_eq!(derived.requires.len(), 2);
        assert!(!derived.requires[0].optional);
        assert_eq!(derived.requires[1].name, "c");
        assert!(derived.requires[1].optional);
        assert!(!derived.requires[1].reexport);
    }

    #[test]
    fn test_framework_extension() {
        let fragment = ModuleDescriptor::new("ext", Version::new(1, 0, 0))
            .with_host(FragmentHost::new("system.bundle").with_extension(ExtensionKind::Framework));
        assert!(fragment.is_fragment());
        assert!(fragment.is_framework_extension());

        let plain = ModuleDescriptor::new("frag", Version::new(1, 0, 0)).with_host(FragmentHost::new("a"));
        assert!(plain.is_fragment());
        assert!(!plain.is_framework_extension());
    }

    #[test]
    fn test_identity() {
        let descriptor = ModuleDescriptor::new("org.example", Version::new(1, 2, 3));
        assert_eq!(descriptor.identity(), "org.example_1.2.3");
        assert_eq!(descriptor.to_string(), "org.example_1.2.3");
    }
}
