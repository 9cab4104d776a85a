// Error types for the audio ETL stage
//
// This module defines custom error types for configuration and per-item
// processing, each carrying a stable numeric code so an outer scheduler can
// classify failures without matching on message text.

mod config;
mod etl;

pub use config::{log_config_error, ConfigError, ConfigErrorCodes};
pub use etl::{log_etl_error, EtlError, EtlErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the batch scheduler boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
