//! # Configuration Management Module
//!
//! Persistent settings stored in the platform config directory.
//!
//! ## Settings
//! - `log_directory`: where session CSV files go (default: `<Documents>/ksmeasuring`)
//! - `sample_interval_ms`: cadence of both the logger and the monitor
//! - `log_on_launch`: start a logging session right away
//! - `show_monitor`: print the live metrics list every tick
//! - `location_permission`: whether the simulated radio reports the fine-location grant
//! - `nr_signal_quality`: whether NR SINR/RSRQ are readable on this platform
//! - `use_system_traffic`: derive throughput from the host's byte counters
//! - `history_capacity`: RSRP points kept for the graph summary
//!
//! ## Storage Location
//! - macOS: ~/Library/Application Support/ks-measuring/config.toml
//! - Linux: ~/.config/ks-measuring/config.toml
//! - Windows: %APPDATA%\ks-measuring\config.toml

use crate::error::ConfigError;
use crate::history::DISPLAY_WINDOW;
use crate::metrics::RadioCapabilities;
use crate::sampling::LoopSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const LOG_SUBDIRECTORY: &str = "ksmeasuring";
const MIN_INTERVAL_MS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_directory: Option<PathBuf>,
    pub sample_interval_ms: u64,
    pub log_on_launch: bool,
    pub show_monitor: bool,
    pub location_permission: bool,
    pub nr_signal_quality: bool,
    pub use_system_traffic: bool,
    pub history_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_directory: None,
            sample_interval_ms: 1000,
            log_on_launch: false,
            show_monitor: true,
            location_permission: true,
            nr_signal_quality: false,
            use_system_traffic: true,
            history_capacity: DISPLAY_WINDOW,
        }
    }
}

impl Config {
    /// Get the path to the config file
    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ks-measuring")
            .join("config.toml")
    }

    /// Load config from the default location, creating it if missing
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::config_path())
    }

    /// Load config from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(ConfigError::ParseFailed),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save_to(path)?;
                log::info!("Wrote default config to {}", path.display());
                Ok(config)
            }
            Err(e) => Err(ConfigError::ReadFailed(e)),
        }
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::WriteFailed)?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(ConfigError::SerializeFailed)?;
        fs::write(path, toml_string).map_err(ConfigError::WriteFailed)?;

        Ok(())
    }

    /// Directory for session files: the override, else `<Documents>/ksmeasuring`
    pub fn log_directory(&self) -> PathBuf {
        match &self.log_directory {
            Some(dir) => dir.clone(),
            None => dirs::document_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(LOG_SUBDIRECTORY),
        }
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(MIN_INTERVAL_MS))
    }

    pub fn capabilities(&self) -> RadioCapabilities {
        RadioCapabilities {
            nr_signal_quality: self.nr_signal_quality,
        }
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            interval: self.sample_interval(),
            capabilities: self.capabilities(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sample_interval(), Duration::from_secs(1));
        assert!(!config.log_on_launch);
        assert!(!config.nr_signal_quality);
        assert_eq!(config.history_capacity, 50);
        assert!(config.log_directory().ends_with("ksmeasuring"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let toml_str = r#"
            log_on_launch = true
            log_directory = "/var/log/ksm"
        "#;

        let config: Config = toml::from_str(toml_str).expect("Failed to deserialize");
        assert!(config.log_on_launch);
        assert_eq!(config.log_directory(), PathBuf::from("/var/log/ksm"));
        assert_eq!(config.sample_interval_ms, 1000);
        assert!(config.show_monitor);
    }

    #[test]
    fn test_interval_has_a_floor() {
        let config = Config {
            sample_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.sample_interval(), Duration::from_millis(MIN_INTERVAL_MS));
    }

    #[test]
    fn test_load_from_creates_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).expect("Failed to load config");
        assert_eq!(config, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config {
            nr_signal_quality: true,
            sample_interval_ms: 500,
            ..Default::default()
        };

        config.save_to(&path).unwrap();
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
        assert!(reloaded.loop_settings().capabilities.nr_signal_quality);
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "sample_interval_ms = \"fast\"").unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::ParseFailed(_))));
    }
}
