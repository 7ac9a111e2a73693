use std::env;
use std::str::FromStr;
use std::time::Duration;

use log::warn;
use serde::Deserialize;

use crate::container::{ExecutionProfile, ResolveSettings, RuntimeEnvironment};

/// Resolver configuration.
///
/// Every field has a default, so an empty configuration file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ResolverConfig {
    /// Maximum number of revisions wired per batch
    pub batch_size: usize,
    /// Time a batch may take before the resolver falls back to one revision at a time
    pub batch_timeout_ms: u64,
    /// Worker pool size for batch wiring
    pub threads: usize,
    /// Enforce "uses" constraints on the first attempt already
    pub keep_uses: bool,
    /// How long to wait for module content to appear on disk
    pub existence_timeout_ms: u64,
    pub environment: RuntimeEnvironment,
    /// Fixed execution profile; all known profiles are combined when unset
    pub profile: Option<String>,
    /// Extra packages the system module exports
    pub provided_packages: Vec<String>,
    /// Additional execution profiles, replacing built-in ones of the same name
    pub profiles: Vec<ExecutionProfile>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_timeout_ms: 2000,
            threads: 1,
            keep_uses: false,
            existence_timeout_ms: 5000,
            environment: RuntimeEnvironment::default(),
            profile: None,
            provided_packages: Vec::new(),
            profiles: Vec::new(),
        }
    }
}

impl ResolverConfig {
    /// Overlay tuning values from `WIREX_*` environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn with_env_overrides(mut self) -> Self {
        override_from_env("WIREX_BATCH_SIZE", &mut self.batch_size);
        override_from_env("WIREX_BATCH_TIMEOUT_MS", &mut self.batch_timeout_ms);
        override_from_env("WIREX_THREADS", &mut self.threads);
        override_from_env("WIREX_KEEP_USES", &mut self.keep_uses);
        override_from_env("WIREX_EXISTENCE_TIMEOUT_MS", &mut self.existence_timeout_ms);
        self
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    pub fn existence_timeout(&self) -> Duration {
        Duration::from_millis(self.existence_timeout_ms)
    }

    /// Settings of the first resolution attempt
    pub fn initial_settings(&self) -> ResolveSettings {
        ResolveSettings {
            keep_uses: self.keep_uses,
            batch_size: self.batch_size,
            batch_timeout: self.batch_timeout(),
            threads: self.threads,
            escalations: 0,
            prunings: 0,
        }
    }
}

fn override_from_env<T: FromStr>(key: &str, target: &mut T) {
    let Ok(value) = env::var(key) else {
        return;
    };
    match value.trim().parse() {
        Ok(parsed) => *target = parsed,
        Err(_) => warn!("Ignoring {}={}: not a valid value", key, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.batch_timeout(), Duration::from_secs(2));
        assert_eq!(config.threads, 1);
        assert!(!config.keep_uses);
        assert_eq!(config.existence_timeout(), Duration::from_secs(5));
        assert!(config.profile.is_none());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ResolverConfig = serde_json::from_str(
            r#"{
                "batch-size": 50,
                "keep-uses": true,
                "environment": {"os": "win32", "ws": "win32"},
                "profile": "JavaSE-17",
                "profiles": [{"name": "Custom-1", "packages": ["a.b"]}]
            }"#,
        )
        .unwrap();
        assert_eq!(config.batch_size, 50);
        assert!(config.keep_uses);
        assert_eq!(config.threads, 1);
        assert_eq!(config.environment.os, "win32");
        assert!(!config.environment.arch.is_empty());
        assert_eq!(config.profile.as_deref(), Some("JavaSE-17"));
        assert_eq!(config.profiles[0].packages, vec!["a.b"]);
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("WIREX_THREADS", "4");
        env::set_var("WIREX_BATCH_SIZE", "many");
        let config = ResolverConfig::default().with_env_overrides();
        env::remove_var("WIREX_THREADS");
        env::remove_var("WIREX_BATCH_SIZE");

        assert_eq!(config.threads, 4);
        assert_eq!(config.batch_size, 10);
    }

    #[test]
    fn test_initial_settings() {
        let config = ResolverConfig {
            keep_uses: true,
            threads: 2,
            ..Default::default()
        };
        let settings = config.initial_settings();
        assert!(settings.keep_uses);
        assert_eq!(settings.threads, 2);
        assert_eq!(settings.escalations, 0);
    }
}
