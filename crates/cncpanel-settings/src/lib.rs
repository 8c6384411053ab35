//! # CNC Panel Settings
//!
//! Configuration file handling: panel behavior, emulator timing and logging.
//! Files are TOML or JSON and live in the platform config directory unless
//! `CNCPANEL_CONFIG` points elsewhere.

pub mod config;
pub mod error;

pub use config::{
    Config, EmulatorSettings, LoggingSettings, PanelSettings, CONFIG_ENV_VAR, LOG_LEVELS,
};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
