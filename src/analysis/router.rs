//! Processing path selection.
//!
//! The service's synchronous API only accepts documents under 5000 bytes.
//! Anything at or above that size must go through an asynchronous job.

use serde::Serialize;

use crate::models::JobKind;

/// Largest payload (exclusive) the synchronous API accepts, in bytes.
pub const SYNC_PAYLOAD_LIMIT: usize = 5000;

/// One of the three analyses run on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisKind {
    Sentiment,
    Entities,
    KeyPhrases,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 3] = [Self::Sentiment, Self::Entities, Self::KeyPhrases];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sentiment => "sentiment",
            Self::Entities => "entities",
            Self::KeyPhrases => "key-phrases",
        }
    }
}

impl From<JobKind> for AnalysisKind {
    fn from(kind: JobKind) -> Self {
        match kind {
            JobKind::Entities => Self::Entities,
            JobKind::KeyPhrases => Self::KeyPhrases,
        }
    }
}

impl std::fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How an analysis is executed against the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingPath {
    /// Single batch-detection call with an immediate result.
    Sync,
    /// Submit a detection job and poll until it finishes.
    Async,
}

impl ProcessingPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Async => "async",
        }
    }
}

impl std::fmt::Display for ProcessingPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Path chosen for a payload of `len` bytes.
pub fn route(len: usize) -> ProcessingPath {
    if len < SYNC_PAYLOAD_LIMIT {
        ProcessingPath::Sync
    } else {
        ProcessingPath::Async
    }
}

/// Per-kind routing decision for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingPlan {
    pub sentiment: ProcessingPath,
    pub entities: ProcessingPath,
    pub key_phrases: ProcessingPath,
}

impl RoutingPlan {
    /// Decide the path for every kind, once, from the document size.
    pub fn for_document(document: &[u8]) -> Self {
        let path = route(document.len());
        match path {
            ProcessingPath::Sync => tracing::info!(
                "File size is under {} bytes: {}",
                SYNC_PAYLOAD_LIMIT,
                document.len()
            ),
            ProcessingPath::Async => tracing::info!(
                "File size is {} bytes or over: {}",
                SYNC_PAYLOAD_LIMIT,
                document.len()
            ),
        }
        Self {
            sentiment: path,
            entities: path,
            key_phrases: path,
        }
    }

    pub fn path_for(&self, kind: AnalysisKind) -> ProcessingPath {
        match kind {
            AnalysisKind::Sentiment => self.sentiment,
            AnalysisKind::Entities => self.entities,
            AnalysisKind::KeyPhrases => self.key_phrases,
        }
    }
}
