use crate::source::{SourceError, SourceName};
use std::fmt;

/// Errors that abort a cost pipeline run. No partial table is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A record source could not be obtained
    SourceRetrieval { source: SourceName, message: String },
    /// A row is missing a required field or carries an undecodable value
    SchemaMismatch {
        source: SourceName,
        row: usize,
        message: String,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::SourceRetrieval { source, message } => {
                write!(f, "Source retrieval failed for {}: {}", source, message)
            }
            PipelineError::SchemaMismatch {
                source,
                row,
                message,
            } => write!(f, "Schema mismatch in {} row {}: {}", source, row, message),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<SourceError> for PipelineError {
    fn from(err: SourceError) -> Self {
        PipelineError::SourceRetrieval {
            source: err.source_name(),
            message: err.to_string(),
        }
    }
}
