//! Package access rules.
//!
//! A rule grants access to one package pattern and says whether that access
//! is discouraged for the consumer.

use std::fmt;

use serde::Serialize;

use crate::descriptor::PackageExport;

/// Package-level visibility marker attached to a dependency entry.
///
/// The pattern is the package name followed by `/*` (`org.example/*`); the
/// default package `.` becomes `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AccessRule {
    pub pattern: String,
    pub discouraged: bool,
}

impl AccessRule {
    pub fn new(pattern: impl Into<String>, discouraged: bool) -> Self {
        Self {
            pattern: pattern.into(),
            discouraged,
        }
    }

    pub fn for_package(package: &str, discouraged: bool) -> Self {
        let pattern = if package == "." {
            "*".to_string()
        } else {
            format!("{}/*", package)
        };
        Self::new(pattern, discouraged)
    }

    /// Rule granted to `consumer` for an exported package.
    ///
    /// Discouraged when the export is `x-internal`, or when it names friends
    /// and `consumer` is not one of them.
    pub fn for_export(consumer: &str, export: &PackageExport) -> Self {
        let discouraged = export.is_internal()
            || export
                .friends()
                .map(|friends| !friends.contains(&consumer))
                .unwrap_or(false);
        Self::for_package(&export.name, discouraged)
    }
}

impl fmt::Display for AccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.discouraged { '~' } else { '+' };
        write!(f, "{}{}", marker, self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern() {
        assert_eq!(AccessRule::for_package("x.y", false).pattern, "x.y/*");
        assert_eq!(AccessRule::for_package(".", false).pattern, "*");
    }

    #[test]
    fn test_unrestricted_export() {
        let rule = AccessRule::for_export("c", &PackageExport::new("x.y"));
        assert_eq!(rule, AccessRule::new("x.y/*", false));
        assert_eq!(rule.to_string(), "+x.y/*");
    }

    #[test]
    fn test_internal_export_is_discouraged() {
        let export = PackageExport::new("x.y").with_directive("x-internal", "true");
        let rule = AccessRule::for_export("c", &export);
        assert!(rule.discouraged);
        assert_eq!(rule.to_string(), "~x.y/*");
    }

    #[test]
    fn test_friends() {
        let export = PackageExport::new("x.impl").with_directive("x-friends", "f, g");
        assert!(AccessRule::for_export("c", &export).discouraged);
        assert!(!AccessRule::for_export("f", &export).discouraged);
        assert!(!AccessRule::for_export("g", &export).discouraged);
    }
}
