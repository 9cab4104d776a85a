// Configuration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Configuration error code constants
///
/// Error code range: 3001-3008
pub struct ConfigErrorCodes {}

impl ConfigErrorCodes {
    /// Duration string could not be parsed or converted
    pub const INVALID_DURATION: i32 = 3001;

    /// Sample rate must be > 0
    pub const INVALID_SAMPLE_RATE: i32 = 3002;

    /// Frame length/stride inconsistent with the max duration
    pub const INVALID_FRAME: i32 = 3003;

    /// Feature kind fields are inconsistent
    pub const INVALID_FEATURE: i32 = 3004;

    /// Augmentation distribution bounds are invalid
    pub const INVALID_DISTRIBUTION: i32 = 3005;

    /// Config file could not be read
    pub const IO: i32 = 3006;

    /// Config JSON could not be parsed
    pub const PARSE: i32 = 3007;

    /// Channel count must be > 0
    pub const INVALID_CHANNELS: i32 = 3008;
}

/// Log a configuration error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_config_error(err: &ConfigError, context: &str) {
    error!(
        "Config error in {}: code={}, component=AudioConfig, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Configuration errors
///
/// Raised while loading or validating an `AudioConfig`, before any item is
/// processed.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Duration string is malformed or resolves to zero samples
    InvalidDuration { value: String },

    /// Sample rate is zero
    InvalidSampleRate,

    /// Frame geometry is unusable
    InvalidFrame { reason: String },

    /// Feature kind fields are inconsistent
    InvalidFeature { reason: String },

    /// Distribution bounds are invalid
    InvalidDistribution { field: String, reason: String },

    /// Reading the config file failed
    Io { path: String, details: String },

    /// Parsing the config JSON failed
    Parse { details: String },

    /// Raw-sample channel count is zero
    InvalidChannels,
}

impl ErrorCode for ConfigError {
    fn code(&self) -> i32 {
        match self {
            ConfigError::InvalidDuration { .. } => ConfigErrorCodes::INVALID_DURATION,
            ConfigError::InvalidSampleRate => ConfigErrorCodes::INVALID_SAMPLE_RATE,
            ConfigError::InvalidFrame { .. } => ConfigErrorCodes::INVALID_FRAME,
            ConfigError::InvalidFeature { .. } => ConfigErrorCodes::INVALID_FEATURE,
            ConfigError::InvalidDistribution { .. } => ConfigErrorCodes::INVALID_DISTRIBUTION,
            ConfigError::Io { .. } => ConfigErrorCodes::IO,
            ConfigError::Parse { .. } => ConfigErrorCodes::PARSE,
            ConfigError::InvalidChannels => ConfigErrorCodes::INVALID_CHANNELS,
        }
    }

    fn message(&self) -> String {
        match self {
            ConfigError::InvalidDuration { value } => {
                format!("Invalid duration '{}'", value)
            }
            ConfigError::InvalidSampleRate => "Sample rate must be greater than 0".to_string(),
            ConfigError::InvalidFrame { reason } => format!("Invalid frame geometry: {}", reason),
            ConfigError::InvalidFeature { reason } => format!("Invalid feature: {}", reason),
            ConfigError::InvalidDistribution { field, reason } => {
                format!("Invalid distribution for {}: {}", field, reason)
            }
            ConfigError::Io { path, details } => {
                format!("Failed to read config {}: {}", path, details)
            }
            ConfigError::Parse { details } => format!("Failed to parse config: {}", details),
            ConfigError::InvalidChannels => "Channel count must be greater than 0".to_string(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ConfigError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse {
            details: err.to_string(),
        }
    }
}
