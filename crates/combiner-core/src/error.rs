//! Error types for combiner-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in combiner-core
///
/// Per-file variants (`FileRead`, `Csv`, `EmptyFile`, `SourceColumnConflict`)
/// are caught by the combiner and recorded as file failures. The rest abort
/// the run.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV error from the csv crate
    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// File had no header or data line left after skipping
    #[error("no columns to parse from '{0}'")]
    EmptyFile(PathBuf),

    /// File already carries the column used for the source tag
    #[error("'{path}' already has a '{column}' column")]
    SourceColumnConflict { path: PathBuf, column: String },

    /// Directory traversal error
    #[error("failed to traverse directory: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Output temp file could not be moved into place
    #[error("failed to write output '{path}': {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
