//! Error types for the analysis pipeline.

use std::fmt;

use thiserror::Error;

/// Errors raised while analysing a document.
///
/// Each variant corresponds to the stage that failed. Branches wrap the
/// error with [`AnalysisError::context`] as it propagates outwards, so the
/// final message reads from the outermost label inwards.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The service rejected an asynchronous job submission.
    #[error("job submission rejected: {0}")]
    Submission(String),

    /// The job status check itself failed.
    #[error("job status check failed: {0}")]
    Poll(String),

    /// The job reached a failed terminal state.
    #[error("job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    /// Fetching an object from storage failed.
    #[error("download failed: {0}")]
    Download(String),

    /// An archive, JSON document or locator could not be decoded.
    #[error("decode failed: {0}")]
    Decode(String),

    /// A synchronous detection call failed.
    #[error("detection failed: {0}")]
    Detection(String),

    /// Waiting on a job was cancelled by the caller.
    #[error("wait for job {0} was cancelled")]
    Cancelled(String),

    #[error("{label}: {source}")]
    Context {
        label: String,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Wrap this error with a short label describing the failed stage.
    pub fn context(self, label: impl Into<String>) -> Self {
        AnalysisError::Context {
            label: label.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with all context labels removed.
    pub fn root(&self) -> &AnalysisError {
        match self {
            AnalysisError::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::Decode(format!("invalid JSON: {}", err))
    }
}

/// Extension for attaching context labels to `Result`s.
pub trait ResultExt<T> {
    fn context(self, label: &str) -> Result<T, AnalysisError>;
}

impl<T> ResultExt<T> for Result<T, AnalysisError> {
    fn context(self, label: &str) -> Result<T, AnalysisError> {
        self.map_err(|e| e.context(label))
    }
}

/// Snapshot of every failure recorded during one orchestration run.
///
/// Displays as each failure's message joined with `" and "`. Repeated
/// messages are kept.
#[derive(Debug)]
pub struct CombinedError {
    errors: Vec<AnalysisError>,
}

impl CombinedError {
    pub(crate) fn new(errors: Vec<AnalysisError>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[AnalysisError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for CombinedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str(" and ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for CombinedError {}
