//! Frequency-based keyword extraction.
//!
//! Supplies the raw keyword list in tag results, the keyword pseudo-tags
//! that backfill sparse model output, and a general fallback signal when
//! embeddings are unavailable.
//!
//! Tokens are lowercased, stripped of non-alphanumeric characters, and
//! split on whitespace. Tokens of length 3 or less and stop-list tokens are
//! dropped regardless of frequency. Ranking is by descending count with
//! first-occurrence order breaking ties — frequency alone does not define a
//! total order, and a stable count is required for determinism.

use std::collections::HashMap;

/// Common function words excluded from keyword output.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "about", "above", "after", "again", "against",
    "all", "also", "because", "been", "before", "being", "below", "between",
    "both", "but", "cannot", "could", "does", "doing", "down", "during",
    "each", "else", "for", "from", "further", "have", "having", "here",
    "how", "into", "itself", "just", "more", "most", "much", "not", "only",
    "onto", "other", "over", "same", "shall", "should", "some", "such",
    "than", "that", "the", "their", "theirs", "them", "then", "there",
    "these", "they", "this", "those", "through", "under", "until", "very",
    "was", "were", "what", "when", "where", "which", "while", "will",
    "with", "would", "your", "yours",
];

/// Extract the `limit` most frequent content words from `text`.
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut first_seen: Vec<String> = Vec::new();

    let normalized: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    for token in normalized.split_whitespace() {
        if token.len() <= 3 || STOP_WORDS.contains(&token) {
            continue;
        }
        let entry = counts.entry(token.to_string()).or_insert(0);
        if *entry == 0 {
            first_seen.push(token.to_string());
        }
        *entry += 1;
    }

    // first_seen carries the tie-break order; the stable sort preserves it
    // among equal counts.
    let mut ranked = first_seen;
    ranked.sort_by(|a, b| counts[b].cmp(&counts[a]));
    ranked.truncate(limit);
    ranked
}
