//! Orchestrator Tests
//!
//! Runs full analyses against an in-memory analysis service and object
//! store, covering both the synchronous and the job-based paths.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use text_analysis::analysis::AnalysisKind;
use text_analysis::client::AnalysisService;
use text_analysis::config::Settings;
use text_analysis::models::{
    DetectedEntity, JobDescription, JobKind, JobRequest, JobStatus, KeyPhrase,
};
use text_analysis::storage::{ObjectLocation, ObjectStore};
use text_analysis::{AnalysisError, AnalysisEvent, Orchestrator};

const ENTITY_OUTPUT: &str = "s3://jobs/entities/123456789012-NER-0a1b2c";
const KEY_PHRASE_OUTPUT: &str = "s3://jobs/key-phrases/123456789012-KP-3d4e5f/output/output.tar.gz";

#[derive(Debug, Clone, Copy, PartialEq)]
enum JobOutcome {
    Complete,
    Fail,
    Never,
}

/// In-memory analysis service.
///
/// Sentences containing "bad" score 0.9, "sad" 0.6, everything else 0.05.
/// Jobs report IN_PROGRESS once before reaching their outcome.
struct FakeService {
    entities: Vec<DetectedEntity>,
    key_phrases: Vec<KeyPhrase>,
    fail_sentiment: bool,
    fail_entities: bool,
    fail_key_phrases: bool,
    reject_entity_job: bool,
    entity_poll_error: bool,
    entity_job: JobOutcome,
    key_phrase_job: JobOutcome,
    jobs: Mutex<Vec<(JobKind, JobRequest)>>,
    polls: Mutex<HashMap<String, usize>>,
    sync_calls: Mutex<usize>,
}

impl FakeService {
    fn new() -> Self {
        Self {
            entities: vec![
                DetectedEntity::new("Alice", "PERSON"),
                DetectedEntity::new("Leeds", "LOCATION"),
                DetectedEntity::new("Alice", "PERSON"),
                DetectedEntity::new("Tuesday", "DATE"),
                DetectedEntity::new("Acme Ltd", "ORGANIZATION"),
                DetectedEntity::new("42", "QUANTITY"),
            ],
            key_phrases: vec![
                KeyPhrase::new("the council"),
                KeyPhrase::new("the new road"),
                KeyPhrase::new("the council"),
            ],
            fail_sentiment: false,
            fail_entities: false,
            fail_key_phrases: false,
            reject_entity_job: false,
            entity_poll_error: false,
            entity_job: JobOutcome::Complete,
            key_phrase_job: JobOutcome::Complete,
            jobs: Mutex::new(Vec::new()),
            polls: Mutex::new(HashMap::new()),
            sync_calls: Mutex::new(0),
        }
    }

    fn outcome(&self, kind: JobKind) -> JobOutcome {
        match kind {
            JobKind::Entities => self.entity_job,
            JobKind::KeyPhrases => self.key_phrase_job,
        }
    }
}

#[async_trait]
impl AnalysisService for FakeService {
    async fn detect_sentiment(&self, text: &str) -> Result<f64, AnalysisError> {
        if self.fail_sentiment {
            return Err(AnalysisError::Detection("throttled".to_string()));
        }
        Ok(if text.contains("bad") {
            0.9
        } else if text.contains("sad") {
            0.6
        } else {
            0.05
        })
    }

    async fn batch_detect_entities(
        &self,
        _text: &str,
    ) -> Result<Vec<DetectedEntity>, AnalysisError> {
        *self.sync_calls.lock().unwrap() += 1;
        if self.fail_entities {
            return Err(AnalysisError::Detection("service unavailable".to_string()));
        }
        Ok(self.entities.clone())
    }

    async fn batch_detect_key_phrases(&self, _text: &str) -> Result<Vec<KeyPhrase>, AnalysisError> {
        *self.sync_calls.lock().unwrap() += 1;
        if self.fail_key_phrases {
            return Err(AnalysisError::Detection("quota exceeded".to_string()));
        }
        Ok(self.key_phrases.clone())
    }

    async fn start_job(&self, kind: JobKind, request: &JobRequest) -> Result<String, AnalysisError> {
        if self.reject_entity_job && kind == JobKind::Entities {
            return Err(AnalysisError::Submission(
                "role cannot be assumed".to_string(),
            ));
        }
        self.jobs.lock().unwrap().push((kind, request.clone()));
        Ok(format!("{}-job", kind))
    }

    async fn describe_job(
        &self,
        kind: JobKind,
        job_id: &str,
    ) -> Result<JobDescription, AnalysisError> {
        let polls = {
            let mut polls = self.polls.lock().unwrap();
            let count = polls.entry(job_id.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        if self.entity_poll_error && kind == JobKind::Entities {
            return Err(AnalysisError::Poll("connection reset".to_string()));
        }

        let in_progress = JobDescription {
            status: JobStatus::InProgress,
            output_uri: None,
            message: None,
        };
        if polls == 1 {
            return Ok(in_progress);
        }

        Ok(match self.outcome(kind) {
            JobOutcome::Complete => JobDescription {
                status: JobStatus::Completed,
                output_uri: Some(
                    match kind {
                        JobKind::Entities => ENTITY_OUTPUT,
                        JobKind::KeyPhrases => KEY_PHRASE_OUTPUT,
                    }
                    .to_string(),
                ),
                message: None,
            },
            JobOutcome::Fail => JobDescription {
                status: JobStatus::Failed,
                output_uri: None,
                message: Some("NO_READ_ACCESS_TO_INPUT".to_string()),
            },
            JobOutcome::Never => in_progress,
        })
    }
}

#[derive(Default)]
struct MemoryStore {
    objects: HashMap<ObjectLocation, Vec<u8>>,
}

impl MemoryStore {
    fn insert(&mut self, uri: &str, bytes: Vec<u8>) {
        self.objects
            .insert(ObjectLocation::parse(uri).unwrap(), bytes);
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, location: &ObjectLocation) -> Result<Vec<u8>, AnalysisError> {
        self.objects
            .get(location)
            .cloned()
            .ok_or_else(|| AnalysisError::Download(format!("no such object: {}", location)))
    }
}

fn tar_gz(name: &str, data: &[u8]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    builder.append_data(&mut header, name, data).unwrap();
    builder.into_inner().unwrap().finish().unwrap()
}

/// Store holding both job output archives at their service locations.
fn job_output_store() -> MemoryStore {
    let mut store = MemoryStore::default();
    store.insert(
        "s3://jobs/entities/123456789012-NER-0a1b2c/output/output.tar.gz",
        tar_gz(
            "output",
            br#"{"Entities":[{"Text":"Alice","Type":"PERSON","Score":0.99},{"Text":"Leeds","Type":"LOCATION","Score":0.97}],"File":"big.txt","Line":0}
{"Entities":[{"Text":"Alice","Type":"PERSON","Score":0.98},{"Text":"Acme Ltd","Type":"ORGANIZATION","Score":0.9}],"File":"big.txt","Line":1}
"#,
        ),
    );
    store.insert(
        KEY_PHRASE_OUTPUT,
        tar_gz(
            "output",
            br#"{"KeyPhrases":[{"Text":"the council","Score":0.99},{"Text":"a planning meeting","Score":0.95},{"Text":"the council","Score":0.99}],"File":"big.txt","Line":0}
"#,
        ),
    );
    store
}

fn settings() -> Settings {
    Settings {
        job_bucket: "jobs".to_string(),
        poll_interval: Duration::from_millis(2),
        ..Settings::default()
    }
}

fn small_document() -> Vec<u8> {
    b"The council met on Tuesday. The new road is bad news for Leeds. Alice was sad to hear it. Acme Ltd will build it."
        .to_vec()
}

fn large_document() -> Vec<u8> {
    let text = (0..300)
        .map(|i| match i {
            57 => "This is bad news for the council".to_string(),
            120 => "Residents were sad about the plan".to_string(),
            _ => format!("Sentence {} is routine", i),
        })
        .collect::<Vec<_>>()
        .join(". ");
    text.into_bytes()
}

fn drain(rx: &mut mpsc::Receiver<AnalysisEvent>) -> Vec<AnalysisEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn small_document_uses_sync_path() {
    let service = Arc::new(FakeService::new());
    let orchestrator = Orchestrator::new(
        service.clone(),
        Arc::new(MemoryStore::default()),
        settings(),
    );

    let (result, errors) = orchestrator.run("news/today.txt", small_document()).await;

    assert!(errors.is_none());
    assert_eq!(result.data_source, "news/today.txt");
    assert!(service.jobs.lock().unwrap().is_empty());
    assert_eq!(*service.sync_calls.lock().unwrap(), 2);

    assert_eq!(result.top_negative_sentiment.len(), 4);
    let top = &result.top_negative_sentiment[0];
    assert_eq!(top.sentence, "The new road is bad news for Leeds");
    assert_eq!(top.negative_sentiment, 0.9);
    assert_eq!(
        top.surrounding_sentences,
        "The council met on Tuesday. The new road is bad news for Leeds. Alice was sad to hear it"
    );
    assert_eq!(
        result.top_negative_sentiment[1].sentence,
        "Alice was sad to hear it"
    );

    let people: Vec<&str> = result.people.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(people, vec!["Alice"]);
    assert_eq!(result.places.len(), 1);
    assert_eq!(result.dates[0].text, "Tuesday");
    assert_eq!(result.organisations[0].text, "Acme Ltd");
    assert_eq!(
        result.key_phrases,
        vec![KeyPhrase::new("the council"), KeyPhrase::new("the new road")]
    );
}

#[tokio::test]
async fn entity_failure_leaves_other_branches_intact() {
    let service = Arc::new(FakeService {
        fail_entities: true,
        ..FakeService::new()
    });
    let (tx, mut rx) = mpsc::channel(64);
    let orchestrator = Orchestrator::new(service, Arc::new(MemoryStore::default()), settings())
        .with_events(tx);

    let (result, errors) = orchestrator.run("news/today.txt", small_document()).await;
    drop(orchestrator);

    let errors = errors.expect("entity branch should fail");
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.to_string(),
        "Unable to perform entity analysis: Unable to perform entity analysis: detection failed: service unavailable"
    );

    assert!(!result.has_entities());
    assert!(!result.top_negative_sentiment.is_empty());
    assert_eq!(result.key_phrases.len(), 2);

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        AnalysisEvent::BranchFailed {
            kind: AnalysisKind::Entities,
            ..
        }
    )));
    let completed = events
        .iter()
        .filter(|e| matches!(e, AnalysisEvent::BranchCompleted { .. }))
        .count();
    assert_eq!(completed, 2);
}

#[tokio::test]
async fn key_phrase_failure_on_sync_path() {
    let service = Arc::new(FakeService {
        fail_key_phrases: true,
        ..FakeService::new()
    });
    let orchestrator =
        Orchestrator::new(service, Arc::new(MemoryStore::default()), settings());

    let (result, errors) = orchestrator.run("news/today.txt", small_document()).await;

    let errors = errors.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.to_string(),
        "Unable to perform key phrase analysis: Unable to perform key phrases analysis: detection failed: quota exceeded"
    );
    assert!(result.key_phrases.is_empty());
    assert!(result.has_entities());
    assert_eq!(result.top_negative_sentiment.len(), 4);
}

#[tokio::test]
async fn sentiment_failure_keeps_no_partial_findings() {
    let service = Arc::new(FakeService {
        fail_sentiment: true,
        ..FakeService::new()
    });
    let orchestrator =
        Orchestrator::new(service, Arc::new(MemoryStore::default()), settings());

    let (result, errors) = orchestrator.run("news/today.txt", small_document()).await;

    let errors = errors.unwrap();
    assert_eq!(
        errors.to_string(),
        "Unable to perform sentiment analysis: detection failed: throttled"
    );
    assert!(result.top_negative_sentiment.is_empty());
    assert!(result.has_entities());
}

#[tokio::test]
async fn large_document_goes_through_jobs() {
    let document = large_document();
    assert!(document.len() >= 5000);

    let service = Arc::new(FakeService::new());
    let (tx, mut rx) = mpsc::channel(512);
    let orchestrator =
        Orchestrator::new(service.clone(), Arc::new(job_output_store()), settings())
            .with_events(tx);

    let (result, errors) = orchestrator.run("big.txt", document).await;
    drop(orchestrator);

    assert!(errors.is_none(), "unexpected errors: {:?}", errors);
    assert_eq!(*service.sync_calls.lock().unwrap(), 0);

    let mut jobs = service.jobs.lock().unwrap().clone();
    jobs.sort_by_key(|(kind, _)| kind.as_str());
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].0, JobKind::Entities);
    assert_eq!(jobs[0].1.input_uri, "s3://jobs/big.txt");
    assert_eq!(jobs[0].1.output_uri, "s3://jobs/entities");
    assert_eq!(jobs[1].1.output_uri, "s3://jobs/key-phrases");
    assert_eq!(jobs[1].1.language_code, "en");

    let people: Vec<&str> = result.people.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(people, vec!["Alice"]);
    assert_eq!(result.places[0].text, "Leeds");
    assert_eq!(result.organisations[0].text, "Acme Ltd");
    assert!(result.dates.is_empty());
    assert_eq!(
        result.key_phrases,
        vec![
            KeyPhrase::new("the council"),
            KeyPhrase::new("a planning meeting")
        ]
    );

    assert_eq!(result.top_negative_sentiment.len(), 10);
    assert_eq!(
        result.top_negative_sentiment[0].sentence,
        "This is bad news for the council"
    );
    assert_eq!(
        result.top_negative_sentiment[1].sentence,
        "Residents were sad about the plan"
    );
    assert_eq!(
        result.top_negative_sentiment[2].sentence,
        "Sentence 0 is routine"
    );

    let submitted = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, AnalysisEvent::JobSubmitted { .. }))
        .count();
    assert_eq!(submitted, 2);
}

#[tokio::test]
async fn failed_job_is_reported_against_output_path() {
    let service = Arc::new(FakeService {
        entity_job: JobOutcome::Fail,
        ..FakeService::new()
    });
    let orchestrator = Orchestrator::new(service, Arc::new(job_output_store()), settings());

    let (result, errors) = orchestrator.run("big.txt", large_document()).await;

    let errors = errors.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.to_string(),
        "Unable to perform entity analysis: Unable to get entity output path: job entities-job failed: NO_READ_ACCESS_TO_INPUT"
    );
    assert!(!result.has_entities());
    assert_eq!(result.key_phrases.len(), 2);
}

#[tokio::test]
async fn rejected_submission_fails_only_its_branch() {
    let service = Arc::new(FakeService {
        reject_entity_job: true,
        ..FakeService::new()
    });
    let orchestrator =
        Orchestrator::new(service.clone(), Arc::new(job_output_store()), settings());

    let (result, errors) = orchestrator.run("big.txt", large_document()).await;

    let errors = errors.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.to_string(),
        "Unable to perform entity analysis: Unable to perform entity analysis job: job submission rejected: role cannot be assumed"
    );
    assert!(matches!(errors.errors()[0].root(), AnalysisError::Submission(_)));

    let jobs = service.jobs.lock().unwrap().clone();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].0, JobKind::KeyPhrases);
    assert!(service.polls.lock().unwrap().get("entities-job").is_none());

    assert!(!result.has_entities());
    assert_eq!(result.key_phrases.len(), 2);
    assert_eq!(result.top_negative_sentiment.len(), 10);
}

#[tokio::test]
async fn status_check_failure_is_reported_against_output_path() {
    let service = Arc::new(FakeService {
        entity_poll_error: true,
        ..FakeService::new()
    });
    let orchestrator =
        Orchestrator::new(service.clone(), Arc::new(job_output_store()), settings());

    let (result, errors) = orchestrator.run("big.txt", large_document()).await;

    let errors = errors.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors.to_string(),
        "Unable to perform entity analysis: Unable to get entity output path: job status check failed: connection reset"
    );
    assert_eq!(service.polls.lock().unwrap().get("entities-job"), Some(&1));

    assert!(!result.has_entities());
    assert_eq!(result.key_phrases.len(), 2);
    assert_eq!(result.top_negative_sentiment.len(), 10);
}

#[tokio::test]
async fn missing_job_output_is_download_error() {
    let service = Arc::new(FakeService::new());
    let orchestrator =
        Orchestrator::new(service, Arc::new(MemoryStore::default()), settings());

    let (result, errors) = orchestrator.run("big.txt", large_document()).await;

    let errors = errors.unwrap();
    assert_eq!(errors.len(), 2);
    for error in errors.errors() {
        assert!(error
            .to_string()
            .contains("Unable to download file and convert to JSON"));
        assert!(matches!(error.root(), AnalysisError::Download(_)));
    }
    assert!(!result.has_entities());
    assert!(result.key_phrases.is_empty());
    assert_eq!(result.top_negative_sentiment.len(), 10);
}

#[tokio::test]
async fn cancellation_stops_job_polling() {
    let service = Arc::new(FakeService {
        entity_job: JobOutcome::Never,
        ..FakeService::new()
    });
    let cancel = CancellationToken::new();
    let orchestrator = Orchestrator::new(service, Arc::new(job_output_store()), settings())
        .with_cancellation(cancel.clone());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let (result, errors) = orchestrator.run("big.txt", large_document()).await;

    let errors = errors.unwrap();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors.errors()[0].root(),
        AnalysisError::Cancelled(_)
    ));
    assert!(errors.to_string().starts_with(
        "Unable to perform entity analysis: Unable to get entity output path"
    ));
    assert_eq!(result.key_phrases.len(), 2);
}
