//! Analysis service client.
//!
//! The [`AnalysisService`] trait is the seam between the orchestration
//! logic and the external NLP service. [`HttpAnalysisClient`] implements it
//! over the service's JSON protocol.

mod http;

use async_trait::async_trait;

use crate::error::AnalysisError;
use crate::models::{DetectedEntity, JobDescription, JobKind, JobRequest, KeyPhrase};

pub use http::{ClientConfig, HttpAnalysisClient};

/// Operations consumed from the external analysis service.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Negative sentiment confidence (0.0 - 1.0) for a single text.
    async fn detect_sentiment(&self, text: &str) -> Result<f64, AnalysisError>;

    /// Synchronously detect entities in a text below the sync payload limit.
    async fn batch_detect_entities(&self, text: &str)
        -> Result<Vec<DetectedEntity>, AnalysisError>;

    /// Synchronously detect key phrases in a text below the sync payload limit.
    async fn batch_detect_key_phrases(&self, text: &str) -> Result<Vec<KeyPhrase>, AnalysisError>;

    /// Submit an asynchronous detection job, returning its id.
    async fn start_job(&self, kind: JobKind, request: &JobRequest) -> Result<String, AnalysisError>;

    /// Fetch the current state of a job.
    async fn describe_job(
        &self,
        kind: JobKind,
        job_id: &str,
    ) -> Result<JobDescription, AnalysisError>;
}
