//! Common error types for the roster checker

use thiserror::Error;

/// Common result type for roster operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the roster checker
#[derive(Error, Debug)]
pub enum Error {
    /// Spreadsheet row identifier column is missing or not an integer
    #[error("Malformed identifier in row {row}: {value:?}")]
    MalformedIdentifier { row: usize, value: String },

    /// Join date cell is non-empty but not a MM/DD/YYYY date
    #[error("Malformed date: {0:?}")]
    MalformedDate(String),

    /// A data source (spreadsheet, xivapi, OAuth) could not be read
    #[error("Source unavailable ({source_name}): {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a `SourceUnavailable` error from any displayable cause
    pub fn source_unavailable(source_name: &str, reason: impl std::fmt::Display) -> Self {
        Error::SourceUnavailable {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }
}
