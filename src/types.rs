//! Error types for vitalwatch

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("telemetry fetch failed: {0}")]
    Telemetry(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("push delivery failed: {0}")]
    Push(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
