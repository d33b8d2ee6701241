use std::path::PathBuf;

use thiserror::Error;

/// Result type used by the pipeline modules.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Typed failures produced by the pipeline.
///
/// File-level failures (`Io`, `Parse`, the key errors) abort work on that
/// file; record-level failures (`MissingField`, `MalformedDate`) skip the
/// record while sibling records continue; `Submission` failures leave the
/// ledger untouched so the record is retried on the next full run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {detail}")]
    Parse { path: PathBuf, detail: String },

    #[error("record is missing required field '{field}'")]
    MissingField { field: String },

    #[error("field '{field}' holds an unparseable date: {value}")]
    MalformedDate { field: String, value: String },

    #[error("no document key found in {path}")]
    NoDocumentKey { path: PathBuf },

    #[error("incomplete document key in {path}: {detail}")]
    IncompleteDocumentKey { path: PathBuf, detail: String },

    #[error("Solr submission failed for '{key}': {detail}")]
    Submission { key: String, detail: String },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        PipelineError::Parse {
            path: path.into(),
            detail: detail.into(),
        }
    }
}
