//! Error types for tf-output.

use std::path::PathBuf;

use thiserror::Error;

use tf_flow::FlowError;
use tf_spatial::SpatialError;

/// Errors from reading inputs or writing results.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("checkpoint in {0} is incomplete: counts and statuses must be saved together")]
    IncompleteCheckpoint(PathBuf),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error(transparent)]
    Spatial(#[from] SpatialError),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Alias for `Result<T, OutputError>`.
pub type OutputResult<T> = Result<T, OutputError>;
