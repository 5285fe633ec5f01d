//! Store error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when reading or writing record files
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record file does not exist
    #[error("Config file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// The record file exists but does not hold a valid record
    #[error("Malformed config file {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    /// A record is already filed under the same file name
    #[error(
        "A record already exists at {} (stored name '{stored_name}'); names differing only by '-' and '_' share one file",
        .path.display()
    )]
    AlreadyExists { path: PathBuf, stored_name: String },

    /// The file name does not start with a known resource kind
    #[error("Cannot determine record type from file name: {0}")]
    UnknownKind(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
