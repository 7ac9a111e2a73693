//! Configuration file lookup.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::debug;
use wirex_resolver::ResolverConfig;

const CONFIG_FILE: &str = "wirex.toml";

/// Load the resolver configuration.
///
/// An explicit path must exist. Otherwise `./wirex.toml` is tried, then
/// the user config directory; with neither present the defaults apply.
/// Environment overrides are applied last.
pub fn load(explicit: Option<&Path>) -> Result<ResolverConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => discover(),
    };

    let config = match path {
        Some(path) => {
            debug!("Reading configuration from {}", path.display());
            parse(&path)?
        }
        None => ResolverConfig::default(),
    };

    Ok(config.with_env_overrides())
}

fn discover() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    ProjectDirs::from("", "", "wirex")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
        .filter(|path| path.is_file())
}

fn parse(path: &Path) -> Result<ResolverConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
threads = 4
profile = "JavaSE-11"
provided-packages = ["org.extra"]

[environment]
os = "macosx"
ws = "cocoa"

[[profiles]]
name = "Custom-1"
packages = ["a.b", "a.c"]
"#,
        )
        .unwrap();

        let config = parse(&path).unwrap();
        assert_eq!(config.threads, 4);
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.profile.as_deref(), Some("JavaSE-11"));
        assert_eq!(config.provided_packages, vec!["org.extra"]);
        assert_eq!(config.environment.os, "macosx");
        assert_eq!(config.profiles[0].packages.len(), 2);
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_invalid_toml_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "threads = \"many\"").unwrap();
        let err = parse(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse"));
    }
}
