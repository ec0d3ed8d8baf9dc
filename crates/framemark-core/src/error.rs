//! Error types for framemark.

use thiserror::Error;

/// Result type alias using framemark's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for framemark operations.
///
/// Missing or malformed session and ledger files never surface as errors;
/// the stores absorb them and fall back to an empty state. Everything that
/// reaches a caller through this type means the requested operation did
/// not complete.
#[derive(Error, Debug)]
pub enum Error {
    /// Resource not found (unknown user, missing dataset)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Value could not be represented in the persisted format
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Tabular (CSV) read or write failed
    #[error("CSV error: {0}")]
    Csv(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
