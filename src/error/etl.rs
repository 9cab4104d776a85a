// Per-item processing error types and constants

use crate::error::{ConfigError, ErrorCode};
use log::error;
use std::fmt;

/// Per-item error code constants
///
/// Error code range: 4001-4007
pub struct EtlErrorCodes {}

impl EtlErrorCodes {
    /// Item bytes could not be decoded into samples
    pub const DECODE: i32 = 4001;

    /// A matrix had unexpected dimensions
    pub const SHAPE_MISMATCH: i32 = 4002;

    /// Destination buffer has the wrong length
    pub const BUFFER_SIZE_MISMATCH: i32 = 4003;

    /// Noise clip index beyond the pool
    pub const NOISE_CLIP_OUT_OF_RANGE: i32 = 4004;

    /// Noise pool could not be loaded
    pub const NOISE_POOL_LOAD: i32 = 4005;

    /// Time-scale factor is not a positive finite number
    pub const INVALID_SCALE: i32 = 4006;

    /// Configuration rejected while building a stage
    pub const CONFIG: i32 = 4007;
}

/// Log a per-item error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_etl_error(err: &EtlError, context: &str) {
    error!(
        "ETL error in {}: code={}, component=AudioPipeline, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Per-item processing errors
///
/// Every variant is fatal for the item being processed; nothing here is
/// retried inside the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum EtlError {
    /// Decoding the encoded item failed
    Decode { details: String },

    /// Matrix dimensions did not match what an operation requires
    ShapeMismatch { reason: String },

    /// Destination buffer length differs from the configured shape
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Explicit noise clip index beyond the loaded pool
    NoiseClipOutOfRange { index: u32, available: usize },

    /// Noise pool index or clip could not be loaded
    NoisePoolLoad { path: String, reason: String },

    /// Time-scale factor is zero, negative or non-finite
    InvalidScale { factor: f32 },

    /// Configuration rejected while building a stage
    Config(ConfigError),
}

impl ErrorCode for EtlError {
    fn code(&self) -> i32 {
        match self {
            EtlError::Decode { .. } => EtlErrorCodes::DECODE,
            EtlError::ShapeMismatch { .. } => EtlErrorCodes::SHAPE_MISMATCH,
            EtlError::BufferSizeMismatch { .. } => EtlErrorCodes::BUFFER_SIZE_MISMATCH,
            EtlError::NoiseClipOutOfRange { .. } => EtlErrorCodes::NOISE_CLIP_OUT_OF_RANGE,
            EtlError::NoisePoolLoad { .. } => EtlErrorCodes::NOISE_POOL_LOAD,
            EtlError::InvalidScale { .. } => EtlErrorCodes::INVALID_SCALE,
            EtlError::Config(_) => EtlErrorCodes::CONFIG,
        }
    }

    fn message(&self) -> String {
        match self {
            EtlError::Decode { details } => format!("Failed to decode item: {}", details),
            EtlError::ShapeMismatch { reason } => format!("Shape mismatch: {}", reason),
            EtlError::BufferSizeMismatch { expected, actual } => {
                format!(
                    "Destination buffer length {} differs from expected {}",
                    actual, expected
                )
            }
            EtlError::NoiseClipOutOfRange { index, available } => {
                format!(
                    "Noise clip index {} out of range ({} clips loaded)",
                    index, available
                )
            }
            EtlError::NoisePoolLoad { path, reason } => {
                format!("Failed to load noise from {}: {}", path, reason)
            }
            EtlError::InvalidScale { factor } => {
                format!("Time-scale factor must be positive and finite (got {})", factor)
            }
            EtlError::Config(err) => err.message(),
        }
    }
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EtlError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for EtlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EtlError::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for EtlError {
    fn from(err: ConfigError) -> Self {
        EtlError::Config(err)
    }
}

impl From<hound::Error> for EtlError {
    fn from(err: hound::Error) -> Self {
        EtlError::Decode {
            details: err.to_string(),
        }
    }
}
