//! Locating and parsing detection job output.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::AnalysisError;
use crate::models::{DetectedEntity, KeyPhrase};
use crate::storage::ObjectLocation;

const OUTPUT_ARCHIVE: &str = "output/output.tar.gz";

/// Resolve the service's output locator to the archive object.
///
/// A locator that already names an archive is used as is. Otherwise the
/// archive lives at `{prefix}/{job-output-id}/output/output.tar.gz`.
pub fn resolve_output_location(output_uri: &str) -> Result<ObjectLocation, AnalysisError> {
    let location = ObjectLocation::parse(output_uri)?;
    if is_archive_key(&location.key) {
        return Ok(location);
    }

    let mut segments = location.key.split('/').filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some(prefix), Some(output_id)) => Ok(ObjectLocation::new(
            location.bucket.clone(),
            format!("{}/{}/{}", prefix, output_id, OUTPUT_ARCHIVE),
        )),
        _ => Err(AnalysisError::Decode(format!(
            "output locator has no job output id: {}",
            output_uri
        ))),
    }
}

fn is_archive_key(key: &str) -> bool {
    key.ends_with(".tar.gz") || key.ends_with(".tgz") || key.ends_with(".zip")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EntitiesLine {
    #[serde(default)]
    entities: Vec<DetectedEntity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KeyPhrasesLine {
    #[serde(default)]
    key_phrases: Vec<KeyPhrase>,
}

/// Parse JSON Lines content, one object per input document.
fn parse_lines<L: DeserializeOwned>(content: &[u8]) -> Result<Vec<L>, AnalysisError> {
    let text = std::str::from_utf8(content)
        .map_err(|e| AnalysisError::Decode(format!("job output is not UTF-8: {}", e)))?;

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| {
                AnalysisError::Decode(format!("invalid job output on line {}: {}", n + 1, e))
            })
        })
        .collect()
}

/// Entities from an entity detection job's output file.
pub fn parse_entities(content: &[u8]) -> Result<Vec<DetectedEntity>, AnalysisError> {
    Ok(parse_lines::<EntitiesLine>(content)?
        .into_iter()
        .flat_map(|line| line.entities)
        .collect())
}

/// Key phrases from a key phrase detection job's output file.
pub fn parse_key_phrases(content: &[u8]) -> Result<Vec<KeyPhrase>, AnalysisError> {
    Ok(parse_lines::<KeyPhrasesLine>(content)?
        .into_iter()
        .flat_map(|line| line.key_phrases)
        .collect())
}
