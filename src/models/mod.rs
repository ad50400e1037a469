//! Data models for text analysis.

mod entity;
mod job;
mod result;

pub use entity::{DetectedEntity, Entity, EntityCategory, KeyPhrase};
pub use job::{AsyncJobHandle, JobDescription, JobKind, JobRequest, JobStatus};
pub use result::{AnalysisResult, SentimentFinding, TypedEntities};
