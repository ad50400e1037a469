//! text-analysis - entity, key phrase and sentiment analysis of stored documents.
//!
//! Documents are fetched from object storage and sent to an external NLP
//! analysis service. Small documents use the service's synchronous batch
//! API; larger ones go through asynchronous detection jobs. The three
//! analyses run concurrently and their results are merged into a single
//! report.

#![allow(clippy::should_implement_trait)]

pub mod analysis;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod storage;

pub use analysis::{AnalysisEvent, Orchestrator};
pub use error::{AnalysisError, CombinedError};
pub use models::AnalysisResult;
