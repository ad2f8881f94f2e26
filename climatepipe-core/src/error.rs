//! Structured error types for the pipeline.
//!
//! Every stage failure aborts the run; there is no partial-success mode and
//! no retry. Display strings are phrased for the CLI surface, which prints
//! them verbatim before exiting non-zero.

use thiserror::Error;

/// Errors raised by the extract, transform, and load stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetch failed for '{dataset}': HTTP {status}")]
    Fetch { dataset: String, status: u16 },

    #[error("network unreachable: {0}")]
    Network(String),

    #[error("cannot decode '{name}': {reason}")]
    Decode { name: String, reason: String },

    #[error("expected column '{column}' is absent in '{dataset}'")]
    MissingColumn { dataset: String, column: String },

    #[error("schema error in '{dataset}': {reason}")]
    Schema { dataset: String, reason: String },

    #[error("archive error in '{name}': {reason}")]
    Archive { name: String, reason: String },

    #[error("credential error: {0}")]
    Credentials(String),

    #[error("target store error: {0}")]
    Load(#[from] rusqlite::Error),

    #[error("staging I/O error: {0}")]
    Io(#[from] std::io::Error),
}
