//! Document analysis pipeline.
//!
//! The [`Orchestrator`] routes a document to the synchronous or job-based
//! path, runs sentiment, entity and key phrase analysis concurrently, and
//! merges the results.

pub mod archive;
pub mod categorize;
pub mod dedup;
mod events;
pub mod job_output;
pub mod multi_error;
mod orchestrator;
pub mod poller;
pub mod router;
pub mod sentiment;

pub use archive::{ArchiveExtractor, ArchiveFormat};
pub use events::AnalysisEvent;
pub use multi_error::MultiError;
pub use orchestrator::Orchestrator;
pub use poller::JobPoller;
pub use router::{route, AnalysisKind, ProcessingPath, RoutingPlan, SYNC_PAYLOAD_LIMIT};
