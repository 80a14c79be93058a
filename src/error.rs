//! Error types for state handlers.

use thiserror::Error;

/// Main error type for state handler operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Jump message carries no serialized state")]
    MissingJumpState,

    #[error("Invalid devtools message: {0}")]
    InvalidMessage(String),

    #[error("No devtools connector attached")]
    DevToolsUnavailable,
}

impl From<serde_json::Error> for StateError {
    fn from(e: serde_json::Error) -> Self {
        StateError::Serialization(e.to_string())
    }
}

/// Result type for state handler operations.
pub type Result<T> = std::result::Result<T, StateError>;
