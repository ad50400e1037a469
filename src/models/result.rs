//! Consolidated analysis report.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::entity::{Entity, KeyPhrase};

/// A sentence scored for negative sentiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SentimentFinding {
    pub sentence: String,
    /// The sentence's three-sentence window, joined with `". "`.
    /// Empty when the document has fewer than three sentences.
    pub surrounding_sentences: String,
    /// Negative sentiment confidence, 0.0 - 1.0.
    pub negative_sentiment: f64,
}

/// Entities bucketed by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypedEntities {
    pub people: Vec<Entity>,
    pub places: Vec<Entity>,
    pub dates: Vec<Entity>,
    pub organisations: Vec<Entity>,
}

impl TypedEntities {
    pub fn len(&self) -> usize {
        self.people.len() + self.places.len() + self.dates.len() + self.organisations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The report produced for one document.
///
/// Field order here is the field order of the serialized file. Sections
/// with no items serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalysisResult {
    pub data_source: String,
    #[serde(
        default,
        serialize_with = "empty_as_null",
        deserialize_with = "null_as_empty"
    )]
    pub top_negative_sentiment: Vec<SentimentFinding>,
    #[serde(
        default,
        serialize_with = "empty_as_null",
        deserialize_with = "null_as_empty"
    )]
    pub people: Vec<Entity>,
    #[serde(
        default,
        serialize_with = "empty_as_null",
        deserialize_with = "null_as_empty"
    )]
    pub places: Vec<Entity>,
    #[serde(
        default,
        serialize_with = "empty_as_null",
        deserialize_with = "null_as_empty"
    )]
    pub dates: Vec<Entity>,
    #[serde(
        default,
        serialize_with = "empty_as_null",
        deserialize_with = "null_as_empty"
    )]
    pub organisations: Vec<Entity>,
    #[serde(
        default,
        serialize_with = "empty_as_null",
        deserialize_with = "null_as_empty"
    )]
    pub key_phrases: Vec<KeyPhrase>,
}

impl AnalysisResult {
    pub fn new(data_source: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            ..Default::default()
        }
    }

    pub fn set_entities(&mut self, entities: TypedEntities) {
        self.people = entities.people;
        self.places = entities.places;
        self.dates = entities.dates;
        self.organisations = entities.organisations;
    }

    pub fn has_entities(&self) -> bool {
        !(self.people.is_empty()
            && self.places.is_empty()
            && self.dates.is_empty()
            && self.organisations.is_empty())
    }
}

fn empty_as_null<T, S>(items: &[T], serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    if items.is_empty() {
        serializer.serialize_none()
    } else {
        serializer.collect_seq(items)
    }
}

fn null_as_empty<'de, T, D>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
