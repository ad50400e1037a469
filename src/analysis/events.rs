//! Progress events emitted while a document is analysed.

use tokio::sync::mpsc;

use super::router::{AnalysisKind, ProcessingPath};
use crate::models::JobStatus;

/// Events emitted during an analysis run.
#[derive(Debug, Clone)]
pub enum AnalysisEvent {
    /// A branch started on the given path
    BranchStarted {
        kind: AnalysisKind,
        path: ProcessingPath,
    },
    /// An asynchronous detection job was accepted
    JobSubmitted { kind: AnalysisKind, job_id: String },
    /// A job status was observed
    JobStatus {
        kind: AnalysisKind,
        job_id: String,
        status: JobStatus,
    },
    /// A branch finished and wrote `items` results
    BranchCompleted { kind: AnalysisKind, items: usize },
    /// A branch failed; its fields stay empty
    BranchFailed { kind: AnalysisKind, error: String },
}

/// Optional event sender. A missing or closed channel drops events.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink {
    tx: Option<mpsc::Sender<AnalysisEvent>>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::Sender<AnalysisEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub(crate) async fn send(&self, event: AnalysisEvent) {
        if let Some(ref tx) = self.tx {
            let _ = tx.send(event).await;
        }
    }
}
