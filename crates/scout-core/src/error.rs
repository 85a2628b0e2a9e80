//! Error types for talentscout.

use thiserror::Error;

/// Result type alias using talentscout's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for talentscout operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Candidate store query failed
    #[error("Store error: {0}")]
    Store(String),

    /// Natural-language query parsing failed
    #[error("Parser error: {0}")]
    Parser(String),

    /// Messaging transport rejected or failed a delivery
    #[error("Messaging error: {0}")]
    Messaging(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A single scoring dimension failed
    #[error("Scoring error in dimension '{dimension}': {message}")]
    Scoring { dimension: String, message: String },

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
