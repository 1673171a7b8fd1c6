//! Error types for the fh-app service layer.

use std::path::PathBuf;

use fh_controls::SwitchCommand;

/// Application error type that wraps errors from the backend crates and
/// gives the CLI and embedding hosts one error interface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Installation error: {0}")]
    Installation(String),

    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Installation validation failed: {0}")]
    Validation(String),

    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Room '{room}' could not be compiled: {message}")]
    Compile { room: String, message: String },

    #[error("Control error: {0}")]
    Control(String),

    /// The heater switch did not carry out a command. Recoverable: heating
    /// state is left as it was and the transition is retried next cycle.
    #[error("Actuator '{entity}' failed to {command} for room '{room}': {message}")]
    Actuator {
        room: String,
        entity: String,
        command: SwitchCommand,
        message: String,
    },

    #[error("Scenario error: {0}")]
    Scenario(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Whether the error only affects the current cycle.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::Actuator { .. })
    }
}

/// Result type for fh-app operations.
pub type AppResult<T> = Result<T, AppError>;

// Conversions from backend error types
impl From<fh_project::ProjectError> for AppError {
    fn from(err: fh_project::ProjectError) -> Self {
        AppError::Installation(err.to_string())
    }
}

impl From<fh_project::ValidationError> for AppError {
    fn from(err: fh_project::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<fh_controls::ControlError> for AppError {
    fn from(err: fh_controls::ControlError) -> Self {
        AppError::Control(err.to_string())
    }
}
