//! Concurrent analysis of one document.
//!
//! Sentiment, entity and key phrase analysis run as three independent tasks.
//! Each task writes only its own fields of the shared result; failures are
//! collected rather than propagated, so a failed branch leaves its fields
//! empty without affecting the others.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::archive::ArchiveExtractor;
use super::categorize::{categorize_entities, unique_key_phrases};
use super::events::{AnalysisEvent, EventSink};
use super::job_output::{parse_entities, parse_key_phrases, resolve_output_location};
use super::multi_error::MultiError;
use super::poller::JobPoller;
use super::router::{AnalysisKind, ProcessingPath, RoutingPlan};
use super::sentiment::analyse_sentiment;
use crate::client::AnalysisService;
use crate::config::Settings;
use crate::error::{AnalysisError, CombinedError, ResultExt};
use crate::models::{AnalysisResult, DetectedEntity, JobKind, KeyPhrase};
use crate::storage::ObjectStore;

const DOWNLOAD_LABEL: &str = "Unable to download file and convert to JSON";

fn branch_label(kind: AnalysisKind) -> &'static str {
    match kind {
        AnalysisKind::Sentiment => "Unable to perform sentiment analysis",
        AnalysisKind::Entities => "Unable to perform entity analysis",
        AnalysisKind::KeyPhrases => "Unable to perform key phrase analysis",
    }
}

fn submission_label(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Entities => "Unable to perform entity analysis job",
        JobKind::KeyPhrases => "Unable to perform key phrase job",
    }
}

/// Runs the three analyses for a document and merges their results.
pub struct Orchestrator {
    service: Arc<dyn AnalysisService>,
    store: Arc<dyn ObjectStore>,
    settings: Settings,
    events: EventSink,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        service: Arc<dyn AnalysisService>,
        store: Arc<dyn ObjectStore>,
        settings: Settings,
    ) -> Self {
        Self {
            service,
            store,
            settings,
            events: EventSink::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Emit progress events on `tx` during runs.
    pub fn with_events(mut self, tx: mpsc::Sender<AnalysisEvent>) -> Self {
        self.events = EventSink::new(tx);
        self
    }

    /// Use `cancel` to abort job polling.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Analyse `document`, stored under `data_source_id`.
    ///
    /// Always returns the result assembled from the branches that
    /// succeeded, plus a combined error when any branch failed.
    pub async fn run(
        &self,
        data_source_id: &str,
        document: Vec<u8>,
    ) -> (AnalysisResult, Option<CombinedError>) {
        let plan = RoutingPlan::for_document(&document);
        let branch = Arc::new(Branch {
            service: self.service.clone(),
            store: self.store.clone(),
            settings: self.settings.clone(),
            events: self.events.clone(),
            cancel: self.cancel.clone(),
            data_source_id: data_source_id.to_string(),
            text: String::from_utf8_lossy(&document).into_owned(),
        });

        let result = Arc::new(Mutex::new(AnalysisResult::new(data_source_id)));
        let errors = Arc::new(MultiError::new());

        let mut handles = Vec::with_capacity(AnalysisKind::ALL.len());
        for kind in AnalysisKind::ALL {
            let path = plan.path_for(kind);
            let branch = branch.clone();
            let result = result.clone();
            let errors = errors.clone();

            let handle = tokio::spawn(async move {
                branch
                    .events
                    .send(AnalysisEvent::BranchStarted { kind, path })
                    .await;

                match branch.run(kind, path, &result).await {
                    Ok(items) => {
                        tracing::info!("{} analysis finished with {} items", kind, items);
                        branch
                            .events
                            .send(AnalysisEvent::BranchCompleted { kind, items })
                            .await;
                    }
                    Err(e) => {
                        tracing::warn!("{} analysis failed: {}", kind, e);
                        branch
                            .events
                            .send(AnalysisEvent::BranchFailed {
                                kind,
                                error: e.to_string(),
                            })
                            .await;
                        errors.add(e);
                    }
                }
            });
            handles.push((kind, handle));
        }

        for (kind, handle) in handles {
            if let Err(e) = handle.await {
                tracing::warn!("{} analysis task aborted: {}", kind, e);
                errors.add(
                    AnalysisError::Detection(format!("analysis task aborted: {}", e))
                        .context(branch_label(kind)),
                );
            }
        }

        let result = std::mem::take(&mut *lock(&result));
        (result, errors.build())
    }
}

fn lock(result: &Mutex<AnalysisResult>) -> std::sync::MutexGuard<'_, AnalysisResult> {
    result.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared by the branch tasks of one run.
struct Branch {
    service: Arc<dyn AnalysisService>,
    store: Arc<dyn ObjectStore>,
    settings: Settings,
    events: EventSink,
    cancel: CancellationToken,
    data_source_id: String,
    text: String,
}

impl Branch {
    /// Run one analysis and store its slice of the result.
    /// Returns the number of items written.
    async fn run(
        &self,
        kind: AnalysisKind,
        path: ProcessingPath,
        result: &Mutex<AnalysisResult>,
    ) -> Result<usize, AnalysisError> {
        match kind {
            AnalysisKind::Sentiment => {
                let findings = analyse_sentiment(self.service.as_ref(), &self.text)
                    .await
                    .context(branch_label(kind))?;
                let items = findings.len();
                lock(result).top_negative_sentiment = findings;
                Ok(items)
            }
            AnalysisKind::Entities => {
                let typed = categorize_entities(
                    self.detect_entities(path)
                        .await
                        .context(branch_label(kind))?,
                );
                let items = typed.len();
                lock(result).set_entities(typed);
                Ok(items)
            }
            AnalysisKind::KeyPhrases => {
                let phrases = unique_key_phrases(
                    self.detect_key_phrases(path)
                        .await
                        .context(branch_label(kind))?,
                );
                let items = phrases.len();
                lock(result).key_phrases = phrases;
                Ok(items)
            }
        }
    }

    async fn detect_entities(
        &self,
        path: ProcessingPath,
    ) -> Result<Vec<DetectedEntity>, AnalysisError> {
        match path {
            ProcessingPath::Sync => self
                .service
                .batch_detect_entities(&self.text)
                .await
                .context("Unable to perform entity analysis"),
            ProcessingPath::Async => {
                let content = self.run_job(JobKind::Entities).await?;
                parse_entities(&content).context(DOWNLOAD_LABEL)
            }
        }
    }

    async fn detect_key_phrases(
        &self,
        path: ProcessingPath,
    ) -> Result<Vec<KeyPhrase>, AnalysisError> {
        match path {
            ProcessingPath::Sync => self
                .service
                .batch_detect_key_phrases(&self.text)
                .await
                .context("Unable to perform key phrases analysis"),
            ProcessingPath::Async => {
                let content = self.run_job(JobKind::KeyPhrases).await?;
                parse_key_phrases(&content).context(DOWNLOAD_LABEL)
            }
        }
    }

    /// Submit a detection job, wait for it, and return the unpacked output file.
    async fn run_job(&self, kind: JobKind) -> Result<Vec<u8>, AnalysisError> {
        let poller = JobPoller::new(self.service.clone(), self.settings.poll_interval)
            .with_sink(self.events.clone());
        let request = self.settings.job_request(&self.data_source_id, kind);

        let mut handle = poller
            .submit(kind, &request)
            .await
            .context(submission_label(kind))?;

        let output_path_label = format!("Unable to get {} output path", kind.label());
        let output_uri = poller
            .await_completion(&mut handle, &self.cancel)
            .await
            .context(&output_path_label)?;
        let location = resolve_output_location(&output_uri).context(&output_path_label)?;

        tracing::info!("Downloading {} job output from {}", kind, location);
        let archive = self.store.get(&location).await.context(DOWNLOAD_LABEL)?;
        ArchiveExtractor::extract_first(&archive).context(DOWNLOAD_LABEL)
    }
}
