//! Error types for the Memo Service

use crate::validation::ValidationErrors;
use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Not found error
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    /// Payload rejected by the validation layer
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    /// Anything else that should surface as an opaque failure
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl From<tokio::task::JoinError> for CoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        CoreError::Internal(format!("Blocking task failed: {}", e))
    }
}

impl From<ValidationErrors> for CoreError {
    fn from(e: ValidationErrors) -> Self {
        CoreError::Validation(e)
    }
}
