//! Errors raised while reading, writing and validating panel settings.

use std::io;
use thiserror::Error;

/// Errors that can occur while loading or saving settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// A settings file exists but could not be parsed.
    #[error("Failed to load settings from {path}: {reason}")]
    LoadError { path: String, reason: String },

    /// Settings could not be serialized for writing.
    #[error("Cannot serialize settings: {0}")]
    SaveError(String),

    /// The configuration directory could not be determined.
    #[error("No config directory: {0}")]
    ConfigDirectory(String),

    /// Reading or writing the settings file failed.
    #[error("Settings file I/O: {0}")]
    Io(#[from] io::Error),

    /// JSON encoding failed.
    #[error("Settings JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration failed validation.
    #[error("Invalid settings: {0}")]
    Invalid(#[from] ConfigError),
}

/// Validation failures for individual settings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The file extension is neither `.toml` nor `.json`.
    #[error("Unsupported settings format '{0}'")]
    UnsupportedFormat(String),

    /// A configuration value is out of its valid range.
    #[error("{key} = {value} is out of range")]
    ValueOutOfRange { key: String, value: String },

    /// A configuration value is not one of the accepted choices.
    #[error("{key} = {value} is not a known value")]
    UnknownValue { key: String, value: String },
}

/// Result of loading or saving settings.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Result of validating settings.
pub type ConfigResult<T> = Result<T, ConfigError>;
