//! Sliding-window word chunker.
//!
//! Splits arbitrary-length text into overlapping, length-bounded windows
//! suitable for feeding to a scoring model. Words are maximal non-whitespace
//! runs; order is preserved.
//!
//! # Algorithm
//!
//! 1. Tokenize on whitespace.
//! 2. If the word count is at most `max_words`, return a single chunk equal
//!    to the whitespace-normalized input.
//! 3. Otherwise emit windows of `max_words` words, advancing by
//!    `max_words - overlap_words` each step so consecutive chunks overlap by
//!    exactly `overlap_words` words.
//! 4. The final window may be shorter; the loop ends when a window's end
//!    reaches the end of the token sequence. No dropped tail, no duplicate
//!    final chunk beyond the defined overlap.
//!
//! Chunking is deterministic: identical input and parameters always yield
//! the identical chunk sequence.

use crate::error::{Error, Result};

/// Window parameters for the chunker, carried in application config.
#[derive(Debug, Clone, Copy)]
pub struct ChunkParams {
    pub max_words: usize,
    pub overlap_words: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            max_words: 400,
            overlap_words: 50,
        }
    }
}

/// Split `text` into overlapping word windows.
///
/// Empty and whitespace-only input yields no chunks. Returns
/// [`Error::InvalidInput`] when `max_words` is zero or `overlap_words` does
/// not leave a positive step (`overlap_words >= max_words`), since a
/// non-positive step cannot make forward progress.
pub fn chunk_words(text: &str, max_words: usize, overlap_words: usize) -> Result<Vec<String>> {
    if max_words == 0 {
        return Err(Error::InvalidInput("max_words must be >= 1".into()));
    }
    if overlap_words >= max_words {
        return Err(Error::InvalidInput(format!(
            "overlap_words ({}) must be smaller than max_words ({})",
            overlap_words, max_words
        )));
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Ok(Vec::new());
    }
    if words.len() <= max_words {
        return Ok(vec![words.join(" ")]);
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + max_words).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end >= words.len() {
            break;
        }
        start = end - overlap_words;
    }

    Ok(chunks)
}

/// Number of whitespace-separated words in `text`. Used by the aggregators'
/// minimum-context pre-filters.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
