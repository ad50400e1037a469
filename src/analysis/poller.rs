//! Submission and polling of asynchronous detection jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::events::{AnalysisEvent, EventSink};
use crate::client::AnalysisService;
use crate::error::AnalysisError;
use crate::models::{AsyncJobHandle, JobKind, JobRequest, JobStatus};

/// Drives a detection job from submission to a terminal state.
pub struct JobPoller {
    service: Arc<dyn AnalysisService>,
    interval: Duration,
    events: EventSink,
}

impl JobPoller {
    pub fn new(service: Arc<dyn AnalysisService>, interval: Duration) -> Self {
        Self {
            service,
            interval,
            events: EventSink::default(),
        }
    }

    /// Emit job submission and status events on `tx`.
    pub fn with_events(mut self, tx: mpsc::Sender<AnalysisEvent>) -> Self {
        self.events = EventSink::new(tx);
        self
    }

    pub(crate) fn with_sink(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Submit a job. Rejections are returned as is and never retried.
    pub async fn submit(
        &self,
        kind: JobKind,
        request: &JobRequest,
    ) -> Result<AsyncJobHandle, AnalysisError> {
        let job_id = self.service.start_job(kind, request).await?;
        tracing::info!("Submitted {} job {} for {}", kind, job_id, request.input_uri);

        self.events
            .send(AnalysisEvent::JobSubmitted {
                kind: kind.into(),
                job_id: job_id.clone(),
            })
            .await;

        Ok(AsyncJobHandle::new(job_id, kind))
    }

    /// Poll until the job completes, returning its output locator.
    ///
    /// Waits one interval before every status check. There is no attempt
    /// limit; cancelling `cancel` ends the wait with
    /// [`AnalysisError::Cancelled`].
    pub async fn await_completion(
        &self,
        handle: &mut AsyncJobHandle,
        cancel: &CancellationToken,
    ) -> Result<String, AnalysisError> {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!("Stopped waiting for job {}", handle.job_id);
                    return Err(AnalysisError::Cancelled(handle.job_id.clone()));
                }
                _ = tokio::time::sleep(self.interval) => {}
            }

            let description = self.service.describe_job(handle.kind, &handle.job_id).await?;
            handle.observe(&description);
            tracing::info!(
                "Job {} status: {} ({}s elapsed)",
                handle.job_id,
                handle.status,
                handle.elapsed_secs()
            );

            self.events
                .send(AnalysisEvent::JobStatus {
                    kind: handle.kind.into(),
                    job_id: handle.job_id.clone(),
                    status: handle.status,
                })
                .await;

            match handle.status {
                JobStatus::Completed => {
                    return handle.output_uri.clone().ok_or_else(|| {
                        AnalysisError::Poll(format!(
                            "job {} completed without an output location",
                            handle.job_id
                        ))
                    });
                }
                status if status.is_failure() => {
                    return Err(AnalysisError::JobFailed {
                        job_id: handle.job_id.clone(),
                        message: description
                            .message
                            .unwrap_or_else(|| format!("job ended with status {}", status)),
                    });
                }
                _ => {}
            }
        }
    }
}
