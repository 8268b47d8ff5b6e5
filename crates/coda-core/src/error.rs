use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading, joining or writing tables.
#[derive(Error, Debug)]
pub enum DataError {
    /// The data contradicts itself: mismatched row counts, dangling ids,
    /// duplicate or missing columns.
    #[error("Data integrity error: {0}")]
    Integrity(String),

    /// A source path is missing or cannot be opened.
    #[error("Source unavailable: {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A source was readable but is not a well-formed table.
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// An output file could not be written.
    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },
}

impl DataError {
    /// Shorthand for [`DataError::Integrity`].
    pub fn integrity(message: impl Into<String>) -> Self {
        DataError::Integrity(message.into())
    }

    /// Returns true for errors that describe inconsistent data rather
    /// than unreadable sources.
    pub fn is_integrity(&self) -> bool {
        matches!(self, DataError::Integrity(_))
    }

    /// Returns true if a source path could not be opened.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, DataError::SourceUnavailable { .. })
    }
}
