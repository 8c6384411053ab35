//! Configuration for the CNC panel
//!
//! Supports JSON and TOML files, chosen by extension. Every section and
//! field has a default, so a partial file only overrides what it names.
//!
//! Configuration is organized into sections:
//! - Panel behavior (acknowledgment watchdog, notice history)
//! - Emulated machine timing
//! - Logging

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the config file location
pub const CONFIG_ENV_VAR: &str = "CNCPANEL_CONFIG";

/// Log levels accepted in `logging.level`
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Panel behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelSettings {
    /// Fail a pending operation that is not acknowledged within this many
    /// milliseconds. Disabled when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack_timeout_ms: Option<u64>,
    /// Number of operator notices kept for display
    pub notice_history: usize,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            ack_timeout_ms: None,
            notice_history: 20,
        }
    }
}

impl PanelSettings {
    pub fn ack_timeout(&self) -> Option<Duration> {
        self.ack_timeout_ms.map(Duration::from_millis)
    }
}

/// Timing of the emulated machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorSettings {
    pub ack_delay_ms: u64,
    pub line_delay_ms: u64,
    pub home_delay_ms: u64,
    pub probe_delay_ms: u64,
    /// Make every probe cycle fail
    pub fail_probe: bool,
}

impl Default for EmulatorSettings {
    fn default() -> Self {
        Self {
            ack_delay_ms: 50,
            line_delay_ms: 200,
            home_delay_ms: 1500,
            probe_delay_ms: 1000,
            fail_probe: false,
        }
    }
}

impl EmulatorSettings {
    pub fn ack_delay(&self) -> Duration {
        Duration::from_millis(self.ack_delay_ms)
    }

    pub fn line_delay(&self) -> Duration {
        Duration::from_millis(self.line_delay_ms)
    }

    pub fn home_delay(&self) -> Duration {
        Duration::from_millis(self.home_delay_ms)
    }

    pub fn probe_delay(&self) -> Duration {
        Duration::from_millis(self.probe_delay_ms)
    }
}

/// Logging preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is not set
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete panel configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub panel: PanelSettings,
    pub emulator: EmulatorSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> ConfigResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location inside the platform config directory
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("cncpanel").join("config.toml"))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory(
                    "platform config directory is unknown".to_string(),
                )
            })
    }

    /// Config file location, honoring `CNCPANEL_CONFIG`
    pub fn resolve_path() -> SettingsResult<PathBuf> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Self::default_path(),
        }
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path)?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content).map_err(|e| {
                SettingsError::LoadError {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
            })?,
            Format::Toml => toml::from_str(&content).map_err(|e| SettingsError::LoadError {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?,
        };

        config.validate()?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(config)
    }

    /// Load config from file, falling back to defaults if it does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("No settings at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    ///
    /// Missing parent directories are created.
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => {
                toml::to_string_pretty(self).map_err(|e| SettingsError::SaveError(e.to_string()))?
            }
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        tracing::debug!("Saved settings to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.panel.ack_timeout_ms == Some(0) {
            return Err(ConfigError::ValueOutOfRange {
                key: "panel.ack_timeout_ms".to_string(),
                value: "0".to_string(),
            });
        }

        if self.panel.notice_history == 0 {
            return Err(ConfigError::ValueOutOfRange {
                key: "panel.notice_history".to_string(),
                value: "0".to_string(),
            });
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::UnknownValue {
                key: "logging.level".to_string(),
                value: self.logging.level.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.panel.ack_timeout(), None);
        assert_eq!(config.emulator.line_delay(), Duration::from_millis(200));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::new();
        config.panel.ack_timeout_ms = Some(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_level() {
        let mut config = Config::new();
        config.logging.level = "loud".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownValue {
                key: "logging.level".to_string(),
                value: "loud".to_string()
            })
        );

        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[panel]\nack_timeout_ms = 5000\n").unwrap();
        assert_eq!(config.panel.ack_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.panel.notice_history, 20);
        assert_eq!(config.emulator, EmulatorSettings::default());
    }

    #[test]
    fn test_format_of() {
        assert_eq!(format_of(Path::new("a.json")), Ok(Format::Json));
        assert_eq!(format_of(Path::new("a.toml")), Ok(Format::Toml));
        assert_eq!(
            format_of(Path::new("a.yaml")),
            Err(ConfigError::UnsupportedFormat("yaml".to_string()))
        );
    }
}
