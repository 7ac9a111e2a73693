//! Host-runtime facts and execution profiles.
//!
//! The synthetic system module is assembled from these: it exports the
//! packages of the selected execution profile (or of every known profile)
//! plus any configured extra packages, and advertises the execution
//! environments those profiles are compatible with.

use std::env;

use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;

use crate::error::{ResolverError, Result};

/// Operating system, windowing system, architecture and language of the
/// runtime the build targets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeEnvironment {
    pub os: String,
    pub ws: String,
    pub arch: String,
    pub nl: String,
}

impl RuntimeEnvironment {
    pub fn new(os: &str, ws: &str, arch: &str, nl: &str) -> Self {
        Self {
            os: os.to_string(),
            ws: ws.to_string(),
            arch: arch.to_string(),
            nl: nl.to_string(),
        }
    }

    /// Facts of the machine running the build
    pub fn host() -> Self {
        let os = match env::consts::OS {
            "linux" => "linux",
            "macos" => "macosx",
            "windows" => "win32",
            "solaris" => "solaris",
            "aix" => "aix",
            _ => "unknown",
        };
        let ws = match os {
            "linux" | "solaris" => "gtk",
            "macosx" => "cocoa",
            "win32" => "win32",
            "aix" => "motif",
            _ => "unknown",
        };
        let arch = match env::consts::ARCH {
            "x86" => "x86",
            "x86_64" => "x86_64",
            "aarch64" => "aarch64",
            "powerpc64" => "ppc64",
            "riscv64" => "riscv64",
            other => other,
        };
        Self::new(os, ws, arch, &host_language())
    }
}

impl Default for RuntimeEnvironment {
    fn default() -> Self {
        Self::host()
    }
}

/// Language tag from `LANG` (`de_DE.UTF-8` -> `de_DE`), `en_US` when unset
fn host_language() -> String {
    env::var("LANG")
        .ok()
        .and_then(|lang| lang.split('.').next().map(str::to_string))
        .filter(|lang| !lang.is_empty() && lang != "C" && lang != "POSIX")
        .unwrap_or_else(|| "en_US".to_string())
}

/// A named set of packages and capabilities provided by the base runtime.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecutionProfile {
    pub name: String,
    #[serde(default)]
    pub packages: Vec<String>,
    /// Execution environment names this profile satisfies, besides its own
    #[serde(default)]
    pub compatible: Vec<String>,
}

impl ExecutionProfile {
    pub fn new(name: &str, packages: &[&str], compatible: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            packages: packages.iter().map(|p| p.to_string()).collect(),
            compatible: compatible.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Execution environments provided, including the profile itself
    pub fn provided_environments(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.compatible.iter().map(String::as_str))
    }
}

const BASE_PACKAGES: &[&str] = &[
    "javax.annotation.processing",
    "javax.crypto",
    "javax.management",
    "javax.naming",
    "javax.net",
    "javax.net.ssl",
    "javax.script",
    "javax.security.auth",
    "javax.sql",
    "javax.xml.parsers",
    "javax.xml.transform",
    "org.w3c.dom",
    "org.xml.sax",
];

/// Profiles known without any configuration
pub fn builtin_profiles() -> Vec<ExecutionProfile> {
    let mut legacy = BASE_PACKAGES.to_vec();
    legacy.extend(["javax.activation", "javax.annotation", "javax.xml.bind"]);

    vec![
        ExecutionProfile::new("JavaSE-1.8", &legacy, &["JavaSE-1.7", "JavaSE-1.6", "J2SE-1.5"]),
        ExecutionProfile::new("JavaSE-11", BASE_PACKAGES, &["JavaSE-10", "JavaSE-9", "JavaSE-1.8", "JavaSE-1.7"]),
        ExecutionProfile::new("JavaSE-17", BASE_PACKAGES, &["JavaSE-16", "JavaSE-11", "JavaSE-1.8"]),
        ExecutionProfile::new("JavaSE-21", BASE_PACKAGES, &["JavaSE-17", "JavaSE-11", "JavaSE-1.8"]),
    ]
}

/// Packages and execution environments the system module provides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemCapabilities {
    pub packages: Vec<String>,
    pub execution_environments: Vec<String>,
}

impl SystemCapabilities {
    /// Assemble the system capabilities.
    ///
    /// With a fixed profile only that profile contributes; without one the
    /// union of all known profiles is used. Configured profiles replace
    /// built-in ones of the same name.
    pub fn assemble(
        configured: &[ExecutionProfile],
        fixed: Option<&str>,
        provided_packages: &[String],
    ) -> Result<Self> {
        let mut known: IndexMap<String, ExecutionProfile> = builtin_profiles()
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        for profile in configured {
            known.insert(profile.name.clone(), profile.clone());
        }

        let selected: Vec<&ExecutionProfile> = match fixed {
            Some(name) => vec![known
                .get(name)
                .ok_or_else(|| ResolverError::UnknownProfile(name.to_string()))?],
            None => known.values().collect(),
        };

        let mut packages: IndexSet<String> = IndexSet::new();
        let mut environments: IndexSet<String> = IndexSet::new();
        for profile in selected {
            packages.extend(profile.packages.iter().cloned());
            environments.extend(profile.provided_environments().map(str::to_string));
        }
        packages.extend(provided_packages.iter().cloned());

        Ok(Self {
            packages: packages.into_iter().collect(),
            execution_environments: environments.into_iter().collect(),
        })
    }

    pub fn provides_environment(&self, name: &str) -> bool {
        self.execution_environments.iter().any(|e| e == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_profile() {
        let caps = SystemCapabilities::assemble(&[], Some("JavaSE-11"), &[]).unwrap();
        assert!(caps.provides_environment("JavaSE-11"));
        assert!(caps.provides_environment("JavaSE-1.8"));
        assert!(!caps.provides_environment("JavaSE-17"));
        assert!(!caps.packages.contains(&"javax.xml.bind".to_string()));
    }

    #[test]
    fn test_union_of_profiles() {
        let caps = SystemCapabilities::assemble(&[], None, &["com.sun.net.httpserver".to_string()]).unwrap();
        assert!(caps.provides_environment("JavaSE-21"));
        assert!(caps.provides_environment("JavaSE-1.8"));
        assert!(caps.packages.contains(&"javax.xml.bind".to_string()));
        assert!(caps.packages.contains(&"com.sun.net.httpserver".to_string()));

        let mut sorted = caps.packages.clone();
        sorted.dedup();
        assert_eq!(sorted.len(), caps.packages.len());
    }

    #[test]
    fn test_unknown_profile() {
        let err = SystemCapabilities::assemble(&[], Some("CDC-1.0"), &[]).unwrap_err();
        assert!(matches!(err, ResolverError::UnknownProfile(name) if name == "CDC-1.0"));
    }

    #[test]
    fn test_configured_profile_overrides_builtin() {
        let custom = ExecutionProfile::new("JavaSE-17", &["only.this"], &[]);
        let caps = SystemCapabilities::assemble(&[custom], Some("JavaSE-17"), &[]).unwrap();
        assert_eq!(caps.packages, vec!["only.this".to_string()]);
        assert_eq!(caps.execution_environments, vec!["JavaSE-17".to_string()]);
    }

    #[test]
    fn test_host_environment_is_populated() {
        let env = RuntimeEnvironment::host();
        assert!(!env.os.is_empty());
        assert!(!env.arch.is_empty());
        assert!(!env.nl.is_empty());
    }
}
