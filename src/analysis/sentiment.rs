//! Sentence windowing and negative sentiment ranking.

use crate::client::AnalysisService;
use crate::error::AnalysisError;
use crate::models::SentimentFinding;

/// Sentence delimiter used for both splitting and joining windows.
pub const SENTENCE_DELIMITER: &str = ". ";

/// Maximum number of findings reported.
pub const TOP_N: usize = 10;

/// Split text into sentences on the exact `". "` delimiter.
///
/// Only the text as a whole is trimmed; individual sentences are left as is.
/// Empty text yields no sentences.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split(SENTENCE_DELIMITER).collect()
}

/// Three-sentence context around `index`, joined with `". "`.
///
/// The first and last sentences use the first and last three sentences.
/// With fewer than three sentences the context is empty.
pub fn context_window(sentences: &[&str], index: usize) -> String {
    let n = sentences.len();
    if n < 3 {
        return String::new();
    }
    let start = if index == 0 {
        0
    } else if index == n - 1 {
        n - 3
    } else {
        index - 1
    };
    sentences[start..start + 3].join(SENTENCE_DELIMITER)
}

/// Sort by descending negativity and keep the top [`TOP_N`].
///
/// The sort is stable, so tied scores keep document order.
pub fn rank_findings(mut findings: Vec<SentimentFinding>) -> Vec<SentimentFinding> {
    findings.sort_by(|a, b| b.negative_sentiment.total_cmp(&a.negative_sentiment));
    findings.truncate(TOP_N);
    findings
}

/// Score every sentence of `text` and return the most negative ones.
///
/// Sentences are scored one at a time; the first failed call aborts the
/// whole analysis.
pub async fn analyse_sentiment(
    service: &dyn AnalysisService,
    text: &str,
) -> Result<Vec<SentimentFinding>, AnalysisError> {
    let sentences = split_sentences(text);
    tracing::info!("Analysing {} sentences for sentiment", sentences.len());

    let mut findings = Vec::with_capacity(sentences.len());
    for (i, sentence) in sentences.iter().enumerate() {
        let surrounding_sentences = context_window(&sentences, i);
        let negative_sentiment = service.detect_sentiment(sentence).await?;
        tracing::debug!("Sentence {} negativity {:.3}", i, negative_sentiment);
        findings.push(SentimentFinding {
            sentence: sentence.to_string(),
            surrounding_sentences,
            negative_sentiment,
        });
    }

    Ok(rank_findings(findings))
}
