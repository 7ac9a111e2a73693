//! wirex subcommands.

pub mod classpath;
pub mod state;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use log::debug;
use wirex_resolver::reader::DESCRIPTOR_FILE;
use wirex_resolver::{DescriptorReader, ModuleResolver, Resolution, ResolverConfig, ResolverError};

pub use classpath::ClasspathArgs;
pub use state::StateArgs;

/// Inputs shared by every command that resolves a module
#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Location of the module to resolve (directory, descriptor file or archive)
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Glob matching modules built alongside the target
    #[arg(long, value_name = "GLOB")]
    pub reactor: Vec<String>,

    /// Directory searched for target platform modules
    #[arg(long, value_name = "DIR")]
    pub platform: Vec<PathBuf>,

    /// Execution profile the system module provides
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Operating system to resolve for
    #[arg(long)]
    pub os: Option<String>,

    /// Windowing system to resolve for
    #[arg(long)]
    pub ws: Option<String>,

    /// Architecture to resolve for
    #[arg(long)]
    pub arch: Option<String>,

    /// Locale to resolve for
    #[arg(long)]
    pub nl: Option<String>,

    /// Enforce uses constraints from the first attempt
    #[arg(long)]
    pub keep_uses: bool,
}

impl ResolveArgs {
    /// Command-line flags override the configuration file
    pub fn apply(&self, config: &mut ResolverConfig) {
        if let Some(profile) = &self.profile {
            config.profile = Some(profile.clone());
        }
        let environment = &mut config.environment;
        for (flag, value) in [
            (&self.os, &mut environment.os),
            (&self.ws, &mut environment.ws),
            (&self.arch, &mut environment.arch),
            (&self.nl, &mut environment.nl),
        ] {
            if let Some(flag) = flag {
                *value = flag.clone();
            }
        }
        if self.keep_uses {
            config.keep_uses = true;
        }
    }

    /// Expand the reactor globs into module locations
    pub fn reactor_locations(&self) -> Result<Vec<PathBuf>> {
        let mut locations = Vec::new();
        for pattern in &self.reactor {
            let paths = glob::glob(pattern).with_context(|| format!("Invalid reactor glob '{}'", pattern))?;
            for path in paths.flatten() {
                if is_module_location(&path) && !locations.contains(&path) {
                    locations.push(path);
                }
            }
        }
        Ok(locations)
    }

    /// Discover the modules of every platform directory
    pub fn platform_locations(&self, reader: &DescriptorReader) -> Result<Vec<PathBuf>> {
        let mut locations = Vec::new();
        for dir in &self.platform {
            if dir.is_file() {
                locations.push(dir.clone());
                continue;
            }
            let found = reader
                .discover(dir)
                .with_context(|| format!("Failed to scan platform directory {}", dir.display()))?;
            debug!("Found {} modules in {}", found.len(), dir.display());
            locations.extend(found);
        }
        Ok(locations)
    }

    /// Resolve the target.
    ///
    /// An unresolved target is returned as `Ok(Err(..))` so commands can
    /// decide how to present it.
    pub fn resolve(&self, mut config: ResolverConfig) -> Result<std::result::Result<Resolution, ResolverError>> {
        self.apply(&mut config);
        let reader = DescriptorReader::new(config.existence_timeout());
        let reactor = self.reactor_locations()?;
        let platform = self.platform_locations(&reader)?;

        let resolver = ModuleResolver::new(config);
        match resolver.resolve_locations(&self.target, &reactor, &platform) {
            Ok(resolution) => Ok(Ok(resolution)),
            Err(e @ ResolverError::Unresolved(_)) => Ok(Err(e)),
            Err(e) => Err(e).with_context(|| format!("Failed to resolve {}", self.target.display())),
        }
    }
}

fn is_module_location(path: &Path) -> bool {
    if path.is_dir() {
        return path.join(DESCRIPTOR_FILE).is_file();
    }
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json" | "jar" | "zip")
    )
}

/// Path shown to the user, relative to the working directory when possible
pub fn display_path(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| pathdiff::diff_paths(path, cwd))
        .filter(|relative| !relative.starts_with(".."))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn args(target: &Path) -> ResolveArgs {
        ResolveArgs {
            target: target.to_path_buf(),
            reactor: Vec::new(),
            platform: Vec::new(),
            profile: None,
            os: None,
            ws: None,
            arch: None,
            nl: None,
            keep_uses: false,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let mut args = args(Path::new("m"));
        args.os = Some("win32".to_string());
        args.profile = Some("JavaSE-11".to_string());
        args.keep_uses = true;

        let mut config = ResolverConfig::default();
        let arch = config.environment.arch.clone();
        args.apply(&mut config);

        assert_eq!(config.environment.os, "win32");
        assert_eq!(config.environment.arch, arch);
        assert_eq!(config.profile.as_deref(), Some("JavaSE-11"));
        assert!(config.keep_uses);
    }

    #[test]
    fn test_reactor_glob_keeps_module_locations() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a", "b"] {
            fs::create_dir_all(dir.path().join(name)).unwrap();
            fs::write(dir.path().join(name).join(DESCRIPTOR_FILE), "{}").unwrap();
        }
        fs::create_dir_all(dir.path().join("docs")).unwrap();

        let mut args = args(Path::new("m"));
        args.reactor = vec![format!("{}/*", dir.path().display())];
        let locations = args.reactor_locations().unwrap();

        assert_eq!(locations, vec![dir.path().join("a"), dir.path().join("b")]);
    }

    #[test]
    fn test_display_path_is_relative_to_cwd() {
        let cwd = std::env::current_dir().unwrap();
        let expected = Path::new("modules").join("m").display().to_string();
        assert_eq!(display_path(&cwd.join("modules").join("m")), expected);
    }
}
