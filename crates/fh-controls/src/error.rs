//! Error types for control operations.

use fh_core::{CoreError, Timestamp};
use thiserror::Error;

/// Result type for control operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur in control operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a control function.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// A reading or parameter was NaN or infinite.
    #[error("Non-finite value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    /// A sample was older than the newest sample already in the window.
    #[error("Out-of-order sample at {attempted} (newest is {newest})")]
    OutOfOrder {
        newest: Timestamp,
        attempted: Timestamp,
    },
}

impl From<CoreError> for ControlError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NonFinite { what, value } => ControlError::NonFinite { what, value },
        }
    }
}
