//! Entity and key phrase models.

use serde::{Deserialize, Serialize};

/// Entity category tag assigned by the detector.
///
/// Only four categories are reported; everything else maps to `Ignored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityCategory {
    Person,
    Location,
    Date,
    Organization,
    Ignored,
}

impl EntityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Location => "LOCATION",
            Self::Date => "DATE",
            Self::Organization => "ORGANIZATION",
            Self::Ignored => "IGNORED",
        }
    }

    /// Map a detector tag to a category. Matching is exact.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "PERSON" => Self::Person,
            "LOCATION" => Self::Location,
            "DATE" => Self::Date,
            "ORGANIZATION" => Self::Organization,
            _ => Self::Ignored,
        }
    }
}

/// A raw entity as returned by the detector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectedEntity {
    pub text: String,
    #[serde(rename = "Type")]
    pub tag: String,
    #[serde(default)]
    pub score: Option<f64>,
}

impl DetectedEntity {
    pub fn new(text: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tag: tag.into(),
            score: None,
        }
    }
}

/// A categorized entity in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Entity {
    pub text: String,
    #[serde(rename = "Type")]
    pub category: EntityCategory,
}

/// A key phrase, as returned by the detector and as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyPhrase {
    pub text: String,
}

impl KeyPhrase {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
