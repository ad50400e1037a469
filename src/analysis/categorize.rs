//! Entity bucketing and key phrase cleanup.

use super::dedup::dedup_by_key;
use crate::models::{DetectedEntity, Entity, EntityCategory, KeyPhrase, TypedEntities};

/// Bucket detected entities into people, places, dates and organisations.
///
/// Unrecognised tags are dropped. Each bucket keeps the first occurrence of
/// a given text, in first-seen order.
pub fn categorize_entities(detected: Vec<DetectedEntity>) -> TypedEntities {
    let mut buckets = TypedEntities::default();

    for item in detected {
        let category = EntityCategory::from_tag(&item.tag);
        let bucket = match category {
            EntityCategory::Person => &mut buckets.people,
            EntityCategory::Location => &mut buckets.places,
            EntityCategory::Date => &mut buckets.dates,
            EntityCategory::Organization => &mut buckets.organisations,
            EntityCategory::Ignored => continue,
        };
        bucket.push(Entity {
            text: item.text,
            category,
        });
    }

    TypedEntities {
        people: dedup_text(buckets.people),
        places: dedup_text(buckets.places),
        dates: dedup_text(buckets.dates),
        organisations: dedup_text(buckets.organisations),
    }
}

fn dedup_text(entities: Vec<Entity>) -> Vec<Entity> {
    dedup_by_key(entities, |e| e.text.clone())
}

/// Deduplicate key phrases by exact text across the whole document.
pub fn unique_key_phrases(phrases: Vec<KeyPhrase>) -> Vec<KeyPhrase> {
    dedup_by_key(phrases, |p| p.text.clone())
}
