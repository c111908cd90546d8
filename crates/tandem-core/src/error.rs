//! Error types for tandem-core

use thiserror::Error;

use crate::transport::TransportError;

/// Result type alias using tandem-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tandem-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The whole push or pull could not be attempted
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A persisted operation kind outside insert/update/delete
    #[error("Unhandled operation kind: {0}")]
    UnhandledOperationKind(String),

    /// The decision source could not produce an answer
    #[error("Decision gateway error: {0}")]
    Gateway(String),

    /// Invalid sync configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
