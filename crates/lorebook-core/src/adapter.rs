//! Model capability trait.
//!
//! The core never executes a model. It depends on three black-box scoring
//! capabilities — extractive question answering, text embedding, and
//! zero-shot classification — behind one trait the application constructs
//! and injects. "Unavailable" is a typed variant the aggregators check once
//! per batch, not a null scattered through every function.
//!
//! Failures are per-call: a single chunk failing to score is recoverable
//! and the aggregators skip it; only [`AdapterError::Unavailable`] aborts a
//! batch, with a fixed per-feature message.

use async_trait::async_trait;
use thiserror::Error;

/// An extractive answer span with the model's confidence.
#[derive(Debug, Clone)]
pub struct AnswerSpan {
    pub text: String,
    /// Confidence in `[0, 1]`.
    pub score: f32,
}

/// One label with its classification confidence.
#[derive(Debug, Clone)]
pub struct LabelScore {
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub score: f32,
}

/// Recoverable failure from a model capability call.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The capability never loaded or is not configured. The string names
    /// the feature for the per-endpoint "not available" message.
    #[error("{0} model not available")]
    Unavailable(&'static str),

    /// One call failed; the batch continues without this unit.
    #[error("model call failed: {0}")]
    Call(String),
}

/// The three scoring capabilities the aggregators consume.
///
/// Implementations must be deterministic for identical input where the
/// underlying model is (the embed contract requires it); the aggregators'
/// tie-break rules assume chunk order, not call completion order.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Extract the best answer span for `question` from `context`.
    async fn answer(&self, question: &str, context: &str) -> Result<AnswerSpan, AdapterError>;

    /// Embed `text` into a fixed-length vector. Deterministic for
    /// identical input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AdapterError>;

    /// Score `text` against every label in `labels`. The result covers
    /// every input label exactly once, ranked by descending score.
    async fn classify(&self, text: &str, labels: &[&str]) -> Result<Vec<LabelScore>, AdapterError>;
}
