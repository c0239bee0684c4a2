//! Error types and handling infrastructure for textgrid.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! custom error types. The binary wraps these with `anyhow` for top-level context.
//!
//! ## Design Principles
//!
//! - **User-friendly messages**: Rejected operations explain what was wrong
//! - **No partial state**: An `Err` from a mutating call means nothing changed
//! - **Consistency**: Standardized Result type across all modules

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for textgrid operations.
///
/// Malformed input is never an error (it is normalized); these variants cover
/// rejected user operations, bad patterns, I/O and worker plumbing.
#[derive(Error, Debug)]
pub enum TableError {
    /// File system related errors (permission denied, read failures, etc.)
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// File not found specifically (common case for user feedback)
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Path exists but is not a regular file
    #[error("Path is not a regular file: {path}")]
    NotAFile { path: PathBuf },

    /// Cell coordinate outside the current table
    #[error("Cell ({row}, {column}) is out of range")]
    OutOfBounds { row: usize, column: usize },

    /// Operation rejected because its arguments do not fit the current table
    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    /// A user supplied regular expression failed to compile
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A parse is already in flight
    #[error("A parse is already in progress")]
    Busy,

    /// The background parse worker is gone
    #[error("Parse worker unavailable")]
    WorkerUnavailable,

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// External transform plugin failures
    #[error("Plugin failed: {message}")]
    PluginError { message: String },

    /// Generic error for cases not covered by specific variants
    #[error("Operation failed: {message}")]
    Other { message: String },
}

/// Standard Result type for textgrid operations.
pub type Result<T> = std::result::Result<T, TableError>;

impl TableError {
    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Create an InvalidOperation with a descriptive message
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create an InvalidPattern from the offending pattern and the compiler message
    pub fn pattern(pattern: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.to_string(),
        }
    }

    /// Create a PluginError with a descriptive message
    pub fn plugin(message: impl Into<String>) -> Self {
        Self::PluginError {
            message: message.into(),
        }
    }

    /// Create a ConfigError with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a generic Other error with a descriptive message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// True for errors that mean "the request was refused, state is untouched"
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::OutOfBounds { .. }
                | Self::InvalidOperation { .. }
                | Self::InvalidPattern { .. }
                | Self::Busy
        )
    }
}

// Automatic conversion from io::Error to TableError
impl From<std::io::Error> for TableError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileError {
                message: "File not found".to_string(),
                source: err,
            },
            std::io::ErrorKind::PermissionDenied => Self::FileError {
                message: "Permission denied".to_string(),
                source: err,
            },
            _ => Self::FileError {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}

impl From<serde_json::Error> for TableError {
    fn from(err: serde_json::Error) -> Self {
        Self::Other {
            message: format!("JSON error: {err}"),
        }
    }
}
