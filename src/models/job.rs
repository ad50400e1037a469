//! Asynchronous detection job models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of asynchronous detection job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    Entities,
    KeyPhrases,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entities => "entities",
            Self::KeyPhrases => "key-phrases",
        }
    }

    /// Prefix under the job bucket where the service writes results.
    pub fn output_prefix(&self) -> &'static str {
        self.as_str()
    }

    /// Human-readable label used in error context.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Entities => "entity",
            Self::KeyPhrases => "key phrase",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job status as reported by the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Submitted,
    InProgress,
    Completed,
    Failed,
    StopRequested,
    Stopped,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::StopRequested => "STOP_REQUESTED",
            Self::Stopped => "STOPPED",
        }
    }

    /// Map a service status string. Unknown values count as still running.
    pub fn from_str(s: &str) -> Self {
        match s {
            "SUBMITTED" => Self::Submitted,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            "STOP_REQUESTED" => Self::StopRequested,
            "STOPPED" => Self::Stopped,
            _ => Self::InProgress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Stopped)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parameters for submitting a detection job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    /// `s3://` URI of the document to analyse.
    pub input_uri: String,
    /// `s3://` URI prefix the service writes its output under.
    pub output_uri: String,
    pub language_code: String,
    pub data_access_role_arn: String,
}

/// Result of describing a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobDescription {
    pub status: JobStatus,
    /// Output location, populated by the service once the job completes.
    pub output_uri: Option<String>,
    /// Failure reason, if the service gave one.
    pub message: Option<String>,
}

/// Tracks a submitted job through its lifecycle.
#[derive(Debug, Clone)]
pub struct AsyncJobHandle {
    pub job_id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Set only once the job has completed.
    pub output_uri: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl AsyncJobHandle {
    pub fn new(job_id: impl Into<String>, kind: JobKind) -> Self {
        Self {
            job_id: job_id.into(),
            kind,
            status: JobStatus::Submitted,
            output_uri: None,
            submitted_at: Utc::now(),
        }
    }

    /// Record a status observation from the service.
    pub fn observe(&mut self, description: &JobDescription) {
        self.status = description.status;
        if description.status == JobStatus::Completed {
            self.output_uri = description.output_uri.clone();
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Seconds since the job was submitted.
    pub fn elapsed_secs(&self) -> i64 {
        (Utc::now() - self.submitted_at).num_seconds()
    }
}
