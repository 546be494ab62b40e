//! Error types for rulestore operations.
//!
//! This module provides the error hierarchy using `thiserror` for the
//! policy adapter, its configuration surface, and the CLI commands.

use thiserror::Error;

/// Result type alias for rulestore operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for rulestore operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Operation invoked before `open` or after `close`.
    #[error("adapter is not open")]
    NotOpen,

    /// A rule tuple exceeds the six-field capacity.
    #[error("rule has {arity} fields, at most {max} are supported")]
    InvalidArity {
        /// Number of fields supplied.
        arity: usize,
        /// Maximum number of fields a record can hold.
        max: usize,
    },

    /// Field offset plus value count exceeds the six-field capacity.
    #[error("field index {field_index} with {count} values exceeds {max} fields")]
    InvalidRange {
        /// First field position constrained.
        field_index: usize,
        /// Number of values supplied.
        count: usize,
        /// Maximum number of fields a record can hold.
        max: usize,
    },

    /// Storage-related errors (database operations).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O errors (policy and config files).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },
}

/// Storage-specific errors for database operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection, query, or encoding error.
    #[error("database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// Transaction could not be started, committed, or rolled back.
    #[error("transaction error: {0}")]
    Transaction(#[source] rusqlite::Error),
}

/// I/O-specific errors for file operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// Failed to read file.
    #[error("failed to read file: {path}: {reason}")]
    ReadFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to write file.
    #[error("failed to write file: {path}: {reason}")]
    WriteFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Directory creation error.
    #[error("failed to create directory: {path}: {reason}")]
    DirectoryFailed {
        /// Path to the directory.
        path: String,
        /// Reason for failure.
        reason: String,
    },
}

/// CLI command-specific errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Policy file line could not be parsed.
    #[error("invalid policy line {line}: {reason}")]
    InvalidPolicyLine {
        /// One-based line number.
        line: usize,
        /// Why the line was rejected.
        reason: String,
    },
}

impl Error {
    /// Builds a configuration error from any displayable message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Database(err))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::config(err.to_string())
    }
}
