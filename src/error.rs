//! Error handling for GRF Core

use thiserror::Error;

/// Errors surfaced by forest training, prediction, and serialization.
#[derive(Error, Debug)]
pub enum GrfError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data processing error: {0}")]
    DataProcessing(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<bincode::Error> for GrfError {
    fn from(err: bincode::Error) -> Self {
        GrfError::Serialization(format!("bincode error: {}", err))
    }
}

impl From<serde_json::Error> for GrfError {
    fn from(err: serde_json::Error) -> Self {
        GrfError::Configuration(format!("JSON error: {}", err))
    }
}

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, GrfError>;
