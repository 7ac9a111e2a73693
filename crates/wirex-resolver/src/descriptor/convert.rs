//! Conversion from the on-disk descriptor form to [`ModuleDescriptor`].

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use wirex_version::{Version, VersionRange};

use super::{
    DescriptorError, ExtensionKind, FragmentHost, ModuleDescriptor, PackageExport, PackageImport,
    PlatformFilter, RequiredModule,
};

/// Descriptor as written in `module.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawDescriptor {
    pub symbolic_name: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub exports: Vec<RawExport>,
    #[serde(default)]
    pub imports: Vec<RawImport>,
    #[serde(default)]
    pub requires: Vec<RawRequire>,
    pub fragment_host: Option<RawHost>,
    #[serde(default)]
    pub extra_requires: Vec<String>,
    #[serde(default)]
    pub execution_environments: Vec<String>,
    pub platform_filter: Option<String>,
    #[serde(default)]
    pub system_module: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawExport {
    pub name: String,
    pub version: Option<String>,
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
    #[serde(default)]
    pub directives: IndexMap<String, String>,
    #[serde(default)]
    pub uses: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawImport {
    pub name: String,
    pub version: Option<String>,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawRequire {
    pub name: String,
    pub version: Option<String>,
    #[serde(default)]
    pub reexport: bool,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RawHost {
    pub name: String,
    pub version: Option<String>,
    pub extension: Option<String>,
}

impl RawDescriptor {
    /// Parse descriptor JSON read from `location`
    pub fn from_slice(data: &[u8], location: &Path) -> Result<Self, DescriptorError> {
        serde_json::from_slice(data).map_err(|source| DescriptorError::Malformed {
            location: location.to_path_buf(),
            source,
        })
    }
}

impl ModuleDescriptor {
    /// Validate a raw descriptor and build the typed form.
    ///
    /// Missing identity fields and unparseable versions fail fast.
    pub fn from_raw(raw: RawDescriptor, location: &Path) -> Result<Self, DescriptorError> {
        let symbolic_name = raw
            .symbolic_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DescriptorError::MissingField {
                location: location.to_path_buf(),
                field: "symbolic-name",
            })?;

        let version_str = raw.version.ok_or_else(|| DescriptorError::MissingField {
            location: location.to_path_buf(),
            field: "version",
        })?;
        let version = parse_version(location, "version", &version_str)?;

        let mut descriptor = ModuleDescriptor::new(symbolic_name, version);

        for export in raw.exports {
            let version = match &export.version {
                Some(v) => parse_version(location, &format!("version of export {}", export.name), v)?,
                None => Version::empty(),
            };
            descriptor.exports.push(PackageExport {
                name: export.name,
                version,
                attributes: export.attributes,
                directives: export.directives,
                uses: export.uses,
            });
        }

        for import in raw.imports {
            let range = parse_range(location, &format!("range of import {}", import.name), import.version.as_deref())?;
            descriptor.imports.push(PackageImport {
                name: import.name,
                range,
                optional: import.optional,
            });
        }

        for require in raw.requires {
            let range = parse_range(location, &format!("range of requirement {}", require.name), require.version.as_deref())?;
            descriptor.requires.push(RequiredModule {
                name: require.name,
                range,
                reexport: require.reexport,
                optional: require.optional,
            });
        }

        if let Some(host) = raw.fragment_host {
            let range = parse_range(location, "range of fragment host", host.version.as_deref())?;
            let extension = match host.extension.as_deref().map(str::trim) {
                None => None,
                Some("framework") => Some(ExtensionKind::Framework),
                Some("bootclasspath") => Some(ExtensionKind::BootClasspath),
                Some(other) => {
                    return Err(DescriptorError::UnknownExtension {
                        location: location.to_path_buf(),
                        value: other.to_string(),
                    })
                }
            };
            descriptor.fragment_host = Some(FragmentHost {
                name: host.name,
                range,
                extension,
            });
        }

        if let Some(filter) = raw.platform_filter {
            let parsed = PlatformFilter::parse(&filter).map_err(|reason| DescriptorError::InvalidFilter {
                location: location.to_path_buf(),
                filter: filter.clone(),
                reason,
            })?;
            descriptor.platform_filter = Some(parsed);
        }

        descriptor.extra_requires = raw.extra_requires;
        descriptor.execution_environments = raw.execution_environments;
        descriptor.system_module = raw.system_module;

        Ok(descriptor)
    }
}

fn parse_version(location: &Path, field: &str, value: &str) -> Result<Version, DescriptorError> {
    Version::parse(value).map_err(|source| DescriptorError::InvalidVersion {
        location: location.to_path_buf(),
        field: field.to_string(),
        value: value.to_string(),
        source,
    })
}

fn parse_range(location: &Path, field: &str, value: Option<&str>) -> Result<VersionRange, DescriptorError> {
    match value {
        None => Ok(VersionRange::any()),
        Some(v) => VersionRange::parse(v).map_err(|source| DescriptorError::InvalidVersion {
            location: location.to_path_buf(),
            field: field.to_string(),
            value: v.to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<ModuleDescriptor, DescriptorError> {
        let location = Path::new("/modules/test");
        let raw = RawDescriptor::from_slice(json.as_bytes(), location)?;
        ModuleDescriptor::from_raw(raw, location)
    }

    #[test]
    fn test_full_descriptor() {
        let descriptor = parse(
            r#"{
                "symbolic-name": "org.example.core",
                "version": "1.2.3.qualifier",
                "exports": [
                    {"name": "org.example.api", "version": "1.2", "uses": ["org.example.spi"]},
                    {"name": "org.example.impl", "directives": {"x-internal": "true"}}
                ],
                "imports": [{"name": "org.slf4j", "version": "[1.7,2)", "optional": true}],
                "requires": [{"name": "org.example.base", "version": "1.0", "reexport": true}],
                "extra-requires": ["org.example.extra"],
                "execution-environments": ["JavaSE-17"],
                "platform-filter": "(osgi.os=linux)"
            }"#,
        )
        .unwrap();

        assert_eq!(descriptor.identity(), "org.example.core_1.2.3.qualifier");
        assert_eq!(descriptor.exports.len(), 2);
        assert_eq!(descriptor.exports[0].version, Version::new(1, 2, 0));
        assert_eq!(descriptor.exports[0].uses, vec!["org.example.spi"]);
        assert!(descriptor.exports[1].is_internal());
        assert!(descriptor.imports[0].optional);
        assert!(descriptor.requires[0].reexport);
        assert_eq!(descriptor.extra_requires, vec!["org.example.extra"]);
        assert_eq!(descriptor.platform_filter.as_ref().unwrap().os.as_deref(), Some("linux"));
        assert!(!descriptor.is_fragment());
    }

    #[test]
    fn test_fragment_descriptor() {
        let descriptor = parse(
            r#"{"symbolic-name": "ext", "version": "1", "fragment-host": {"name": "system.bundle", "extension": "framework"}}"#,
        )
        .unwrap();
        assert!(descriptor.is_framework_extension());
    }

    #[test]
    fn test_missing_identity_fails() {
        let err = parse(r#"{"version": "1.0"}"#).unwrap_err();
        assert!(matches!(err, DescriptorError::MissingField { field: "symbolic-name", .. }));

        let err = parse(r#"{"symbolic-name": "a"}"#).unwrap_err();
        assert!(matches!(err, DescriptorError::MissingField { field: "version", .. }));

        let err = parse(r#"{"symbolic-name": "  ", "version": "1"}"#).unwrap_err();
        assert!(matches!(err, DescriptorError::MissingField { .. }));
    }

    #[test]
    fn test_invalid_versions_fail() {
        assert!(matches!(
            parse(r#"{"symbolic-name": "a", "version": "one"}"#).unwrap_err(),
            DescriptorError::InvalidVersion { .. }
        ));
        assert!(matches!(
            parse(r#"{"symbolic-name": "a", "version": "1", "imports": [{"name": "p", "version": "[1,"}]}"#).unwrap_err(),
            DescriptorError::InvalidVersion { .. }
        ));
    }

    #[test]
    fn test_unknown_extension_and_bad_filter() {
        assert!(matches!(
            parse(r#"{"symbolic-name": "a", "version": "1", "fragment-host": {"name": "h", "extension": "weird"}}"#).unwrap_err(),
            DescriptorError::UnknownExtension { .. }
        ));
        assert!(matches!(
            parse(r#"{"symbolic-name": "a", "version": "1", "platform-filter": "(|(osgi.os=a)(osgi.os=b))"}"#).unwrap_err(),
            DescriptorError::InvalidFilter { .. }
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(parse("{not json").unwrap_err(), DescriptorError::Malformed { .. }));
    }
}
