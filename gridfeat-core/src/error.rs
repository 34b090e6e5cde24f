//! Structured error types for the transformation core.
//!
//! Every variant is fatal to a pipeline run; there is no partial-success path.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("schema mismatch in {}: expected columns {expected:?}, found {found:?}", file.display())]
    SchemaMismatch {
        file: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("no CSV files found in {}", dir.display())]
    NoInputFiles { dir: PathBuf },

    #[error("duplicate record for key '{key}' at {timestamp}")]
    DuplicateKey { timestamp: String, key: String },

    #[error("inner join is empty: no timestamps left after joining table '{table}'")]
    EmptyJoinResult { table: String },

    #[error("missing column '{column}' (needed by {context})")]
    MissingColumn { column: String, context: String },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("column '{column}' has {actual} values, index has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("index is not strictly ascending at position {position}")]
    UnorderedIndex { position: usize },

    #[error("cannot parse timestamp '{value}' in column '{column}': {reason}")]
    TimestampParse {
        column: String,
        value: String,
        reason: String,
    },

    #[error("read failed for {}: {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("record set error: {0}")]
    RecordSet(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FeatureError>;

impl FeatureError {
    pub(crate) fn missing(column: impl Into<String>, context: impl Into<String>) -> Self {
        FeatureError::MissingColumn {
            column: column.into(),
            context: context.into(),
        }
    }
}
