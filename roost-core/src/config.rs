//! Configuration management for Roost
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (ROOST_*)
//! 3. Config file (~/.config/roost/config.toml)
//! 4. Default values
//!
//! This is the tool's own configuration. The checkout registry and groups
//! live in the settings store (see [`crate::settings`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::status::PollSchedule;
use crate::{Error, Result};

/// Status polling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Poll period while the operator is watching (focused)
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Multiplier applied to `poll_interval` while unfocused
    pub unfocused_factor: u32,

    /// Count untracked files as dirty
    pub include_untracked: bool,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            unfocused_factor: 3,
            include_untracked: false,
        }
    }
}

impl StatusConfig {
    /// Build the poll schedule described by this config
    pub fn schedule(&self) -> PollSchedule {
        PollSchedule::new(self.poll_interval, self.unfocused_factor)
    }
}

/// Batch executor configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of checkouts worked on at once
    pub max_workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_workers: 8 }
    }
}

/// Update indicator configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Number of ticks a checkout stays marked as updated
    pub blink_cycles: u32,

    /// Tick period
    #[serde(with = "humantime_serde")]
    pub tick: Duration,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            blink_cycles: 6,
            tick: Duration::from_millis(500),
        }
    }
}

/// Settings store location
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Explicit settings file; defaults to `~/.config/roost/settings.json`
    pub path: Option<PathBuf>,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Status polling
    pub status: StatusConfig,

    /// Batch operations
    pub batch: BatchConfig,

    /// Update indicator
    pub notifier: NotifierConfig,

    /// Settings store
    pub settings: SettingsConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/roost/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("roost").join("config.toml"))
    }

    /// Resolve the settings file, falling back to `~/.config/roost/settings.json`
    pub fn settings_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.settings.path {
            return Ok(path.clone());
        }

        dirs::config_dir()
            .map(|p| p.join("roost").join("settings.json"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - ROOST_SETTINGS: Path to the settings file
    /// - ROOST_MAX_WORKERS: Batch worker count
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var("ROOST_SETTINGS") {
            self.settings.path = Some(PathBuf::from(path));
        }

        if let Ok(workers) = std::env::var("ROOST_MAX_WORKERS") {
            match workers.parse() {
                Ok(n) => self.batch.max_workers = n,
                Err(_) => tracing::warn!("Ignoring invalid ROOST_MAX_WORKERS: {}", workers),
            }
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, settings: Option<PathBuf>, jobs: Option<usize>) -> Self {
        if let Some(path) = settings {
            self.settings.path = Some(path);
        }

        if let Some(n) = jobs {
            self.batch.max_workers = n;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(settings: Option<PathBuf>, jobs: Option<usize>) -> Result<Self> {
        Ok(Self::load()?
            .with_env_overrides()
            .with_cli_overrides(settings, jobs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.status.poll_interval, Duration::from_secs(5));
        assert_eq!(config.status.unfocused_factor, 3);
        assert!(!config.status.include_untracked);
        assert_eq!(config.batch.max_workers, 8);
        assert_eq!(config.notifier.blink_cycles, 6);
        assert_eq!(config.notifier.tick, Duration::from_millis(500));
        assert!(config.settings.path.is_none());
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::default()
            .with_cli_overrides(Some(PathBuf::from("/tmp/settings.json")), Some(2));

        assert_eq!(config.settings.path, Some(PathBuf::from("/tmp/settings.json")));
        assert_eq!(config.batch.max_workers, 2);
        assert_eq!(
            config.settings_path().unwrap(),
            PathBuf::from("/tmp/settings.json")
        );
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[status]
poll_interval = "2s"
unfocused_factor = 4
include_untracked = true

[batch]
max_workers = 3

[notifier]
blink_cycles = 10
tick = "250ms"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.status.poll_interval, Duration::from_secs(2));
        assert_eq!(config.status.unfocused_factor, 4);
        assert!(config.status.include_untracked);
        assert_eq!(config.batch.max_workers, 3);
        assert_eq!(config.notifier.blink_cycles, 10);
        assert_eq!(config.notifier.tick, Duration::from_millis(250));
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
[batch]
max_workers = 1
"#;
        let config: Config = toml::from_str(toml).unwrap();
        // everything else falls back to defaults
        assert_eq!(config.batch.max_workers, 1);
        assert_eq!(config.status.poll_interval, Duration::from_secs(5));
        assert_eq!(config.notifier.blink_cycles, 6);
    }

    #[test]
    fn test_schedule_from_config() {
        let schedule = StatusConfig::default().schedule();
        assert_eq!(schedule.focused(), Duration::from_secs(5));
        assert_eq!(schedule.unfocused(), Duration::from_secs(15));
    }
}
