//! Configuration for the sync client.
//!
//! [`SyncConfig`] is what a [`SyncClient`](crate::SyncClient) runs with.
//! [`Settings`] is the on-disk form: a TOML file holding a `[sync]` table and
//! a `[cache]` table, every key optional.

use std::path::{Path, PathBuf};

use docsync_core::FlushPolicy;
use docsync_types::CACHE_SCHEMA_VERSION;
use serde::Deserialize;

/// Behaviour switches for one client instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// Queue failed writes for later replay (default: true).
    ///
    /// When off, a write the remote rejects is dropped after logging.
    #[serde(default = "default_pending_writes")]
    pub pending_writes: bool,
    /// Most writes kept queued at once (default: 100).
    #[serde(default = "default_max_pending_writes")]
    pub max_pending_writes: usize,
    /// What a flush does after a write fails (default: continue).
    #[serde(default)]
    pub flush_policy: FlushPolicy,
    /// Envelope version this build writes and accepts.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
}

fn default_pending_writes() -> bool {
    true
}

fn default_max_pending_writes() -> usize {
    100
}

fn default_schema_version() -> String {
    CACHE_SCHEMA_VERSION.to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            pending_writes: default_pending_writes(),
            max_pending_writes: default_max_pending_writes(),
            flush_policy: FlushPolicy::default(),
            schema_version: default_schema_version(),
        }
    }
}

impl SyncConfig {
    /// Enable or disable the pending-write queue.
    pub fn with_pending_writes(mut self, enabled: bool) -> Self {
        self.pending_writes = enabled;
        self
    }

    /// Set the queue capacity.
    pub fn with_max_pending_writes(mut self, max: usize) -> Self {
        self.max_pending_writes = max;
        self
    }

    /// Set the flush failure policy.
    pub fn with_flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.flush_policy = policy;
        self
    }

    /// Set the cache schema version.
    pub fn with_schema_version(mut self, version: &str) -> Self {
        self.schema_version = version.to_string();
        self
    }
}

/// Cache location settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CacheSettings {
    /// Envelope file. When unset the caller picks a default location.
    pub path: Option<PathBuf>,
}

/// Root of the settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Client behaviour.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Cache location.
    #[serde(default)]
    pub cache: CacheSettings,
}

impl Settings {
    /// Load settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_queues_writes() {
        let config = SyncConfig::default();
        assert!(config.pending_writes);
        assert_eq!(config.max_pending_writes, 100);
        assert_eq!(config.flush_policy, FlushPolicy::ContinueOnFailure);
        assert_eq!(config.schema_version, CACHE_SCHEMA_VERSION);
    }

    #[test]
    fn config_builder_pattern() {
        let config = SyncConfig::default()
            .with_pending_writes(false)
            .with_max_pending_writes(5)
            .with_flush_policy(FlushPolicy::StopAtFirstFailure)
            .with_schema_version("2.0");

        assert!(!config.pending_writes);
        assert_eq!(config.max_pending_writes, 5);
        assert_eq!(config.flush_policy, FlushPolicy::StopAtFirstFailure);
        assert_eq!(config.schema_version, "2.0");
    }

    #[test]
    fn settings_from_toml_string() {
        let toml = r#"
[sync]
pending_writes = false
max_pending_writes = 10
flush_policy = "stop-at-first-failure"

[cache]
path = "/data/profile.cache"
"#;

        let settings: Settings = toml::from_str(toml).unwrap();
        assert!(!settings.sync.pending_writes);
        assert_eq!(settings.sync.max_pending_writes, 10);
        assert_eq!(settings.sync.flush_policy, FlushPolicy::StopAtFirstFailure);
        assert_eq!(
            settings.cache.path,
            Some(PathBuf::from("/data/profile.cache"))
        );
    }

    #[test]
    fn settings_missing_fields_use_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings, Settings::default());

        let settings: Settings = toml::from_str("[sync]\nmax_pending_writes = 3\n").unwrap();
        assert!(settings.sync.pending_writes);
        assert_eq!(settings.sync.max_pending_writes, 3);
        assert!(settings.cache.path.is_none());
    }

    #[test]
    fn from_file_reports_missing_file() {
        let result = Settings::from_file(Path::new("/nonexistent/docsync.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn from_file_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docsync.toml");
        std::fs::write(&path, "[sync\npending_writes = ").unwrap();

        let result = Settings::from_file(&path);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }
}
