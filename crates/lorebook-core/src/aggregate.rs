//! Score aggregation: the retrieval core.
//!
//! Three features — question answering, link suggestion, auto-tagging —
//! share one shape: score chunks (or documents) through a model capability,
//! then threshold, rank, and truncate into a single result. This module is
//! that shape, specialized three ways over the same store and adapter
//! capabilities:
//!
//! | Mode | Reduction |
//! |------|-----------|
//! | [`answer_question`] | keep the single best-scoring answer span |
//! | [`suggest_links`] | similarity-ranked list, top 5 |
//! | [`generate_tags`] | confidence-averaged label set, top 10 |
//!
//! Per-chunk scoring failures are logged and skipped; the batch always
//! completes. All thresholds are strict (`>`), and ties resolve to the
//! earlier chunk or document in iteration order — the reference
//! implementation scores sequentially, which satisfies that ordering
//! trivially. Scoring thresholds are design constants, not configuration.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::adapter::{AdapterError, AnswerSpan, ModelAdapter};
use crate::chunk::{chunk_words, word_count, ChunkParams};
use crate::error::{Error, Result};
use crate::keywords::extract_keywords;
use crate::models::{Document, GeneratedTag, LinkSuggestion, RelationKind, TagResult};
use crate::similarity::SimilarityIndex;
use crate::store::WorkspaceStore;

/// An answer is kept only if the best chunk score strictly exceeds this.
pub const ANSWER_SCORE_THRESHOLD: f32 = 0.1;
/// Chunks with fewer words than this are never scored for answering.
pub const MIN_ANSWER_CONTEXT_WORDS: usize = 5;
/// Chunks with fewer words than this are never classified for tagging.
pub const MIN_CLASSIFY_CONTEXT_WORDS: usize = 10;

/// Link suggestions must score strictly above this.
pub const SUGGESTION_THRESHOLD: f32 = 0.3;
/// Scores strictly above this band as "semantic" rather than "contextual".
pub const SEMANTIC_BAND_THRESHOLD: f32 = 0.6;
/// Suggestion lists are truncated to this many entries.
pub const MAX_SUGGESTIONS: usize = 5;
/// Preview excerpts carry at most this many content characters.
pub const PREVIEW_CHARS: usize = 150;

/// Per-chunk label scores must strictly exceed this to enter the average.
pub const LABEL_SCORE_THRESHOLD: f32 = 0.3;
/// A label survives only if its mean retained score strictly exceeds this.
pub const LABEL_MEAN_THRESHOLD: f32 = 0.4;
/// At most this many chunks are classified per tagging request; excess
/// chunks are ignored, bounding latency without wall-clock cancellation.
pub const MAX_TAG_CHUNKS: usize = 5;
/// Tag lists are truncated to this many entries.
pub const MAX_TAGS: usize = 10;
/// Below this many surviving model tags, keyword pseudo-tags backfill.
pub const MIN_MODEL_TAGS: usize = 5;
/// At most this many keyword pseudo-tags are backfilled.
pub const MAX_KEYWORD_TAGS: usize = 3;
/// Confidence assigned to keyword pseudo-tags.
pub const KEYWORD_TAG_CONFIDENCE: f32 = 0.5;
/// Raw keyword list length reported alongside tags.
pub const KEYWORD_LIST_LIMIT: usize = 5;

/// The closed candidate vocabulary for zero-shot tagging.
pub const TAG_VOCABULARY: [&str; 24] = [
    "meeting",
    "strategy",
    "research",
    "todo",
    "idea",
    "project",
    "documentation",
    "notes",
    "planning",
    "brainstorming",
    "analysis",
    "report",
    "presentation",
    "technical",
    "business",
    "creative",
    "personal",
    "urgent",
    "completed",
    "in-progress",
    "review",
    "collaboration",
    "learning",
    "reference",
];

/// Sentinel answer text while no chunk has scored yet. Never surfaces:
/// a best score of 0 always falls through to [`Answer::NoConfidentAnswer`].
const ANSWER_NOT_FOUND: &str = "I couldn't find a relevant answer in the provided documents.";

/// Outcome of a question-answering request. The variants are textually
/// distinguishable so callers and tests can branch on them.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// The best chunk's answer, with its confidence.
    Confident { text: String, score: f32 },
    /// Every chunk scored at or below the confidence threshold.
    NoConfidentAnswer,
    /// The workspace had no extractable content; no model call was made.
    NoContent,
    /// The question was empty or whitespace; no model call was made.
    EmptyQuestion,
    /// The answering capability is not available.
    ModelUnavailable,
}

impl Answer {
    /// The user-facing answer text for this outcome.
    pub fn message(&self) -> &str {
        match self {
            Answer::Confident { text, .. } => text,
            Answer::NoConfidentAnswer => {
                "I couldn't find a confident answer to your question in the uploaded documents. \
                 Please try rephrasing your question or upload more relevant content."
            }
            Answer::NoContent => {
                "No content found in the workspace to search through. \
                 Please add some documents first."
            }
            Answer::EmptyQuestion => "Please provide a valid question.",
            Answer::ModelUnavailable => {
                "Question answering model not available. \
                 Please check the model server and try again."
            }
        }
    }

    pub fn is_confident(&self) -> bool {
        matches!(self, Answer::Confident { .. })
    }
}

/// Concatenate a workspace's documents into one scoring context.
fn join_workspace_content(docs: &[Document]) -> String {
    docs.iter()
        .map(|d| format!("Title: {}\nContent: {}", d.title, d.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Answer `question` from the workspace's concatenated content.
///
/// Chunks the content, scores each chunk through the answer capability, and
/// keeps the single best span. Replacement is on strictly greater score, so
/// ties keep the earlier chunk's answer. A final best score at or below
/// [`ANSWER_SCORE_THRESHOLD`] yields [`Answer::NoConfidentAnswer`].
pub async fn answer_question(
    store: &dyn WorkspaceStore,
    adapter: &dyn ModelAdapter,
    workspace: &str,
    question: &str,
    chunking: ChunkParams,
) -> Result<Answer> {
    let question = question.trim();
    if question.is_empty() {
        return Ok(Answer::EmptyQuestion);
    }

    let docs = store.list_documents(workspace).await?;
    let content = join_workspace_content(&docs);
    if content.trim().is_empty() {
        return Ok(Answer::NoContent);
    }

    let chunks = chunk_words(&content, chunking.max_words, chunking.overlap_words)?;
    debug!(workspace, chunks = chunks.len(), "scoring chunks for question");

    let mut best = AnswerSpan {
        text: ANSWER_NOT_FOUND.to_string(),
        score: 0.0,
    };
    for (i, chunk) in chunks.iter().enumerate() {
        if word_count(chunk) < MIN_ANSWER_CONTEXT_WORDS {
            continue;
        }
        match adapter.answer(question, chunk).await {
            Ok(span) => {
                if span.score > best.score {
                    best = span;
                }
            }
            Err(AdapterError::Unavailable(_)) => return Ok(Answer::ModelUnavailable),
            Err(AdapterError::Call(e)) => {
                warn!(chunk = i, error = %e, "skipping chunk that failed to score");
            }
        }
    }

    if best.score > ANSWER_SCORE_THRESHOLD {
        Ok(Answer::Confident {
            text: best.text,
            score: best.score,
        })
    } else {
        Ok(Answer::NoConfidentAnswer)
    }
}

/// Count how many lowercase query tokens appear as substrings of the
/// candidate's lowercase content, normalized by the query token count and
/// clamped to 1.0. The degraded similarity signal when embeddings are
/// unavailable.
fn keyword_overlap(query: &str, content: &str) -> (f32, usize) {
    let query_lower = query.to_lowercase();
    let tokens: Vec<&str> = query_lower.split_whitespace().collect();
    if tokens.is_empty() {
        return (0.0, 0);
    }
    let content_lower = content.to_lowercase();
    let matches = tokens.iter().filter(|t| content_lower.contains(**t)).count();
    ((matches as f32 / tokens.len() as f32).min(1.0), matches)
}

fn relation_kind(score: f32) -> RelationKind {
    if score > SEMANTIC_BAND_THRESHOLD {
        RelationKind::Semantic
    } else {
        RelationKind::Contextual
    }
}

/// First [`PREVIEW_CHARS`] characters of `content`, with an ellipsis when
/// truncated. Never exceeds 153 characters.
fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let mut p: String = content.chars().take(PREVIEW_CHARS).collect();
        p.push_str("...");
        p
    } else {
        content.to_string()
    }
}

/// Suggest documents in `workspace` related to `text`.
///
/// Embeds the query once and ranks candidates by cosine similarity against
/// their stored embeddings. Candidates without an embedding — and every
/// candidate when the embed capability is unavailable — are scored by
/// keyword overlap instead, with a distinguishable `reason`. Survivors
/// (strictly above [`SUGGESTION_THRESHOLD`]) are banded semantic/contextual,
/// sorted descending with document order breaking ties, and truncated to
/// [`MAX_SUGGESTIONS`]. `exclude_id` skips self-comparison when linking an
/// existing document.
pub async fn suggest_links(
    store: &dyn WorkspaceStore,
    adapter: &dyn ModelAdapter,
    workspace: &str,
    text: &str,
    exclude_id: Option<&str>,
) -> Result<Vec<LinkSuggestion>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let docs = store.list_documents(workspace).await?;
    if docs.is_empty() {
        return Ok(Vec::new());
    }

    let query_vec = match adapter.embed(text).await {
        Ok(v) => Some(v),
        Err(AdapterError::Unavailable(_)) => {
            debug!(workspace, "embedding unavailable; falling back to keyword overlap");
            None
        }
        Err(AdapterError::Call(e)) => {
            warn!(workspace, error = %e, "query embedding failed; falling back to keyword overlap");
            None
        }
    };

    let semantic: HashMap<String, f32> = match &query_vec {
        Some(qv) => SimilarityIndex::from_documents(docs.iter())
            .rank(qv, SUGGESTION_THRESHOLD, exclude_id)
            .into_iter()
            .collect(),
        None => HashMap::new(),
    };

    let mut suggestions = Vec::new();
    for doc in &docs {
        if exclude_id == Some(doc.id.as_str()) {
            continue;
        }

        let scored = if query_vec.is_some() && doc.embedding.is_some() {
            // Absent from the ranked map means below threshold.
            semantic
                .get(&doc.id)
                .map(|s| (*s, format!("Semantic similarity: {:.2}", s)))
        } else {
            let (score, matches) = keyword_overlap(text, &doc.content);
            (score > SUGGESTION_THRESHOLD)
                .then(|| (score, format!("Found {} relevant keywords", matches)))
        };

        if let Some((score, reason)) = scored {
            suggestions.push(LinkSuggestion {
                id: doc.id.clone(),
                target_page: doc.title.clone(),
                confidence: score,
                reason,
                preview: preview(&doc.content),
                kind: relation_kind(score),
            });
        }
    }

    suggestions.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    suggestions.truncate(MAX_SUGGESTIONS);
    Ok(suggestions)
}

fn round3(x: f32) -> f32 {
    (x * 1000.0).round() / 1000.0
}

/// Generate tags for `workspace` content (or `content_override`).
///
/// Classifies at most the first [`MAX_TAG_CHUNKS`] chunks of at least
/// [`MIN_CLASSIFY_CONTEXT_WORDS`] words against [`TAG_VOCABULARY`]. Per
/// chunk, only labels strictly above [`LABEL_SCORE_THRESHOLD`] enter the
/// accumulator; a label survives if its mean retained score strictly
/// exceeds [`LABEL_MEAN_THRESHOLD`]. Survivors are sorted by mean
/// descending (vocabulary order breaks ties) and truncated to
/// [`MAX_TAGS`]. Sparse results are backfilled with keyword pseudo-tags
/// marked `type: "keyword"`.
pub async fn generate_tags(
    store: &dyn WorkspaceStore,
    adapter: &dyn ModelAdapter,
    workspace: &str,
    content_override: Option<&str>,
    chunking: ChunkParams,
) -> Result<TagResult> {
    let content = match content_override {
        Some(c) => c.to_string(),
        None => {
            let docs = store.list_documents(workspace).await?;
            docs.iter()
                .map(|d| d.content.clone())
                .collect::<Vec<_>>()
                .join("\n")
        }
    };

    let total_content_length = content.chars().count();
    if content.trim().is_empty() {
        return Ok(TagResult {
            tags: Vec::new(),
            keywords: Vec::new(),
            total_content_length,
            chunks_analyzed: 0,
        });
    }

    let chunks = chunk_words(&content, chunking.max_words, chunking.overlap_words)?;
    let mut retained: HashMap<String, Vec<f32>> = HashMap::new();
    let mut chunks_analyzed = 0usize;

    for (i, chunk) in chunks
        .iter()
        .enumerate()
        .filter(|(_, c)| word_count(c) >= MIN_CLASSIFY_CONTEXT_WORDS)
        .take(MAX_TAG_CHUNKS)
    {
        match adapter.classify(chunk, &TAG_VOCABULARY).await {
            Ok(labels) => {
                chunks_analyzed += 1;
                for ls in labels {
                    if ls.score > LABEL_SCORE_THRESHOLD {
                        retained.entry(ls.label).or_default().push(ls.score);
                    }
                }
            }
            Err(AdapterError::Unavailable(_)) => {
                return Err(Error::ModelUnavailable("Auto-tagging"));
            }
            Err(AdapterError::Call(e)) => {
                warn!(chunk = i, error = %e, "skipping chunk that failed to classify");
            }
        }
    }

    // Means are computed in vocabulary order so the stable sort breaks
    // score ties deterministically.
    let mut tags: Vec<GeneratedTag> = Vec::new();
    for label in TAG_VOCABULARY.iter() {
        if let Some(scores) = retained.get(*label) {
            let mean = scores.iter().sum::<f32>() / scores.len() as f32;
            if mean > LABEL_MEAN_THRESHOLD {
                tags.push(GeneratedTag {
                    name: (*label).to_string(),
                    confidence: round3(mean),
                    auto_generated: true,
                    kind: None,
                });
            }
        }
    }
    tags.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    tags.truncate(MAX_TAGS);

    let keywords = extract_keywords(&content, KEYWORD_LIST_LIMIT);

    if tags.len() < MIN_MODEL_TAGS {
        let mut backfilled = 0usize;
        for kw in &keywords {
            if backfilled >= MAX_KEYWORD_TAGS {
                break;
            }
            if tags.iter().any(|t| t.name == *kw) {
                continue;
            }
            tags.push(GeneratedTag {
                name: kw.clone(),
                confidence: KEYWORD_TAG_CONFIDENCE,
                auto_generated: true,
                kind: Some("keyword".to_string()),
            });
            backfilled += 1;
        }
    }

    Ok(TagResult {
        tags,
        keywords,
        total_content_length,
        chunks_analyzed,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::adapter::LabelScore;
    use crate::store::MemoryStore;

    /// Scripted adapter: answer scores play back in call order (`None`
    /// fails the call), embeddings come from a text lookup, classify
    /// scripts play back per call. Counts every model call so tests can
    /// assert that short-circuit paths never reach the model.
    #[derive(Default)]
    struct StubAdapter {
        answer_scores: Vec<Option<f32>>,
        embeddings: HashMap<String, Vec<f32>>,
        classify_scripts: Vec<Vec<(&'static str, f32)>>,
        unavailable: bool,
        calls: AtomicUsize,
        next_answer: AtomicUsize,
        next_classify: AtomicUsize,
    }

    impl StubAdapter {
        fn unavailable() -> Self {
            Self {
                unavailable: true,
                ..Self::default()
            }
        }

        fn with_answer_scores(scores: &[Option<f32>]) -> Self {
            Self {
                answer_scores: scores.to_vec(),
                ..Self::default()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelAdapter for StubAdapter {
        async fn answer(&self, _q: &str, _ctx: &str) -> Result<AnswerSpan, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unavailable {
                return Err(AdapterError::Unavailable("question answering"));
            }
            let idx = self.next_answer.fetch_add(1, Ordering::SeqCst);
            match self.answer_scores.get(idx).copied().flatten() {
                Some(score) => Ok(AnswerSpan {
                    text: format!("answer-{}", idx),
                    score,
                }),
                None => Err(AdapterError::Call(format!("scripted failure at {}", idx))),
            }
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unavailable {
                return Err(AdapterError::Unavailable("embedding"));
            }
            self.embeddings
                .get(text)
                .cloned()
                .ok_or_else(|| AdapterError::Call("no scripted embedding".into()))
        }

        async fn classify(
            &self,
            _text: &str,
            labels: &[&str],
        ) -> Result<Vec<LabelScore>, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unavailable {
                return Err(AdapterError::Unavailable("zero-shot classification"));
            }
            let idx = self.next_classify.fetch_add(1, Ordering::SeqCst);
            let script = self.classify_scripts.get(idx).cloned().unwrap_or_default();
            // Covers every input label exactly once, per the contract.
            Ok(labels
                .iter()
                .map(|l| LabelScore {
                    label: (*l).to_string(),
                    score: script
                        .iter()
                        .find(|(name, _)| name == l)
                        .map(|(_, s)| *s)
                        .unwrap_or(0.01),
                })
                .collect())
        }
    }

    fn numbered_words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    async fn store_with_content(words: usize) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .put_document("ws", &Document::new("d1", "T", numbered_words(words)))
            .await
            .unwrap();
        store
    }

    /// With `max_words: 10, overlap_words: 2`, a 27-word document joins to
    /// a 30-word context ("Title: T Content: ..." adds three words) and
    /// chunks into exactly four windows.
    fn four_chunk_params() -> ChunkParams {
        ChunkParams {
            max_words: 10,
            overlap_words: 2,
        }
    }

    #[tokio::test]
    async fn test_best_answer_leftmost_wins_on_tie() {
        let store = store_with_content(27).await;
        let adapter =
            StubAdapter::with_answer_scores(&[Some(0.05), Some(0.4), Some(0.4), Some(0.2)]);

        let answer = answer_question(&store, &adapter, "ws", "what?", four_chunk_params())
            .await
            .unwrap();

        // The second call (index 1) is the first 0.4; the later 0.4 must
        // not replace it, and 0.4 > 0.1 makes it confident.
        assert_eq!(
            answer,
            Answer::Confident {
                text: "answer-1".to_string(),
                score: 0.4
            }
        );
        assert_eq!(adapter.call_count(), 4);
    }

    #[tokio::test]
    async fn test_all_low_scores_yield_fallback_message() {
        let store = store_with_content(27).await;
        let adapter =
            StubAdapter::with_answer_scores(&[Some(0.05), Some(0.05), Some(0.05), Some(0.05)]);

        let answer = answer_question(&store, &adapter, "ws", "what?", four_chunk_params())
            .await
            .unwrap();

        assert_eq!(answer, Answer::NoConfidentAnswer);
        assert_eq!(
            answer.message(),
            "I couldn't find a confident answer to your question in the uploaded documents. \
             Please try rephrasing your question or upload more relevant content."
        );
    }

    #[tokio::test]
    async fn test_score_exactly_at_threshold_is_not_confident() {
        let store = store_with_content(5).await;
        let adapter = StubAdapter::with_answer_scores(&[Some(0.1)]);

        let answer = answer_question(&store, &adapter, "ws", "what?", ChunkParams::default())
            .await
            .unwrap();
        assert_eq!(answer, Answer::NoConfidentAnswer);
    }

    #[tokio::test]
    async fn test_failed_chunk_is_skipped_not_fatal() {
        let store = store_with_content(27).await;
        let adapter = StubAdapter::with_answer_scores(&[None, Some(0.5), None, Some(0.3)]);

        let answer = answer_question(&store, &adapter, "ws", "what?", four_chunk_params())
            .await
            .unwrap();
        assert_eq!(
            answer,
            Answer::Confident {
                text: "answer-1".to_string(),
                score: 0.5
            }
        );
    }

    #[tokio::test]
    async fn test_empty_question_short_circuits() {
        let store = store_with_content(5).await;
        let adapter = StubAdapter::default();

        let answer = answer_question(&store, &adapter, "ws", "   ", ChunkParams::default())
            .await
            .unwrap();
        assert_eq!(answer, Answer::EmptyQuestion);
        assert_eq!(adapter.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_workspace_answers_without_model_calls() {
        let store = MemoryStore::new();
        let adapter = StubAdapter::default();

        let answer = answer_question(&store, &adapter, "ws", "what?", ChunkParams::default())
            .await
            .unwrap();
        assert_eq!(answer, Answer::NoContent);
        assert_eq!(adapter.call_count(), 0);
    }

    #[tokio::test]
    async fn test_answer_model_unavailable() {
        let store = store_with_content(5).await;
        let adapter = StubAdapter::unavailable();

        let answer = answer_question(&store, &adapter, "ws", "what?", ChunkParams::default())
            .await
            .unwrap();
        assert_eq!(answer, Answer::ModelUnavailable);
    }

    #[test]
    fn test_relation_banding_boundaries() {
        assert_eq!(relation_kind(0.61), RelationKind::Semantic);
        assert_eq!(relation_kind(0.6), RelationKind::Contextual);
        assert_eq!(relation_kind(0.31), RelationKind::Contextual);
    }

    #[test]
    fn test_keyword_overlap_boundary_is_strict() {
        // 3 of 10 tokens match: the ratio is exactly the threshold value
        // and must not pass the strict comparison.
        let (score, matches) = keyword_overlap("t0 t1 t2 t3 t4 t5 t6 t7 t8 t9", "t0 t1 t2");
        assert_eq!(matches, 3);
        assert!(!(score > SUGGESTION_THRESHOLD));

        let (score, matches) = keyword_overlap("t0 t1 t2 t3 t4 t5 t6 t7 t8 t9", "t0 t1 t2 t3");
        assert_eq!(matches, 4);
        assert!(score > SUGGESTION_THRESHOLD);
    }

    fn doc_with_embedding(id: &str, title: &str, content: &str, vec: Vec<f32>) -> Document {
        let mut doc = Document::new(id, title, content);
        doc.embedding = Some(vec);
        doc
    }

    #[tokio::test]
    async fn test_suggestion_threshold_is_strict() {
        // Keyword fallback produces exact ratios: 3/10 = 0.3 must be
        // excluded, 4/10 included as contextual, 7/10 as semantic.
        let store = MemoryStore::new();
        let query = "qa0 qa1 qa2 qa3 qa4 qa5 qa6 qa7 qa8 qa9";
        store
            .put_document("ws", &Document::new("three", "Three", "qa0 qa1 qa2"))
            .await
            .unwrap();
        store
            .put_document("ws", &Document::new("four", "Four", "qa0 qa1 qa2 qa3"))
            .await
            .unwrap();
        store
            .put_document(
                "ws",
                &Document::new("seven", "Seven", "qa0 qa1 qa2 qa3 qa4 qa5 qa6"),
            )
            .await
            .unwrap();
        let adapter = StubAdapter::unavailable();

        let suggestions = suggest_links(&store, &adapter, "ws", query, None)
            .await
            .unwrap();

        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].id, "seven");
        assert_eq!(suggestions[0].kind, RelationKind::Semantic);
        assert!(suggestions[0].reason.starts_with("Found 7"));
        assert_eq!(suggestions[1].id, "four");
        assert_eq!(suggestions[1].kind, RelationKind::Contextual);
    }

    #[tokio::test]
    async fn test_suggestions_truncate_to_five_sorted() {
        let store = MemoryStore::new();
        let query = "qb0 qb1 qb2 qb3 qb4 qb5 qb6 qb7 qb8 qb9";
        let tokens: Vec<&str> = query.split_whitespace().collect();
        // Seven candidates matching 10, 9, ..., 4 of the 10 query tokens.
        for (i, matched) in (4..=10).rev().enumerate() {
            let content = tokens[..matched].join(" ");
            store
                .put_document(
                    "ws",
                    &Document::new(format!("d{}", i), format!("D{}", i), content),
                )
                .await
                .unwrap();
        }
        let adapter = StubAdapter::unavailable();

        let suggestions = suggest_links(&store, &adapter, "ws", query, None)
            .await
            .unwrap();

        assert_eq!(suggestions.len(), MAX_SUGGESTIONS);
        for pair in suggestions.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
        assert_eq!(suggestions[0].id, "d0");
        assert!((suggestions[0].confidence - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_semantic_ranking_with_keyword_fallback_for_unembedded() {
        let store = MemoryStore::new();
        let query = "release planning for the storage engine";
        store
            .put_document(
                "ws",
                &doc_with_embedding("close", "Close", "similar page", vec![1.0, 0.0]),
            )
            .await
            .unwrap();
        store
            .put_document(
                "ws",
                &doc_with_embedding("mid", "Mid", "related page", vec![1.0, 1.0]),
            )
            .await
            .unwrap();
        store
            .put_document(
                "ws",
                &doc_with_embedding("far", "Far", "unrelated page", vec![0.0, 1.0]),
            )
            .await
            .unwrap();
        // No embedding: scored by keyword overlap (6/6 tokens match).
        store
            .put_document(
                "ws",
                &Document::new("plain", "Plain", "release planning for the storage engine notes"),
            )
            .await
            .unwrap();

        let mut adapter = StubAdapter::default();
        adapter
            .embeddings
            .insert(query.to_string(), vec![1.0, 0.0]);

        let suggestions = suggest_links(&store, &adapter, "ws", query, None)
            .await
            .unwrap();

        // cos(close)=1.0, keyword(plain)=1.0, cos(mid)≈0.707; far excluded.
        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions[0].id, "close");
        assert!(suggestions[0].reason.starts_with("Semantic similarity"));
        assert_eq!(suggestions[1].id, "plain");
        assert!(suggestions[1].reason.starts_with("Found"));
        assert_eq!(suggestions[2].id, "mid");
        assert_eq!(suggestions[2].kind, RelationKind::Semantic);
    }

    #[tokio::test]
    async fn test_suggestions_exclude_self() {
        let store = MemoryStore::new();
        store
            .put_document("ws", &Document::new("self", "Self", "alpha beta gamma"))
            .await
            .unwrap();
        let adapter = StubAdapter::unavailable();

        let suggestions = suggest_links(&store, &adapter, "ws", "alpha beta gamma", Some("self"))
            .await
            .unwrap();
        assert!(suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_yields_no_suggestions() {
        let store = store_with_content(5).await;
        let adapter = StubAdapter::default();
        let suggestions = suggest_links(&store, &adapter, "ws", "  ", None).await.unwrap();
        assert!(suggestions.is_empty());
        assert_eq!(adapter.call_count(), 0);
    }

    #[tokio::test]
    async fn test_preview_never_exceeds_153_chars() {
        let store = MemoryStore::new();
        store
            .put_document(
                "ws",
                &Document::new("long", "Long", format!("match {}", "x".repeat(400))),
            )
            .await
            .unwrap();
        let adapter = StubAdapter::unavailable();

        let suggestions = suggest_links(&store, &adapter, "ws", "match", None).await.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].preview.chars().count(), 153);
        assert!(suggestions[0].preview.ends_with("..."));
    }

    /// With `max_words: 12, overlap_words: 2`, 22 words chunk into exactly
    /// two 12-word windows, both above the classification minimum.
    fn two_chunk_params() -> ChunkParams {
        ChunkParams {
            max_words: 12,
            overlap_words: 2,
        }
    }

    #[tokio::test]
    async fn test_tag_mean_retention() {
        let store = MemoryStore::new();
        let mut adapter = StubAdapter::default();
        // "research": [0.35, 0.5] → mean 0.425 > 0.4, retained.
        // "meeting": 0.32 retained per-chunk, 0.2 filtered before the
        // accumulator; mean 0.32 < 0.4, dropped.
        adapter.classify_scripts = vec![
            vec![("research", 0.35), ("meeting", 0.32)],
            vec![("research", 0.5), ("meeting", 0.2)],
        ];

        let content = numbered_words(22);
        let result = generate_tags(&store, &adapter, "ws", Some(&content), two_chunk_params())
            .await
            .unwrap();

        assert_eq!(result.chunks_analyzed, 2);
        let model_tags: Vec<&GeneratedTag> =
            result.tags.iter().filter(|t| t.kind.is_none()).collect();
        assert_eq!(model_tags.len(), 1);
        assert_eq!(model_tags[0].name, "research");
        assert!((model_tags[0].confidence - 0.425).abs() < 1e-4);
        assert!(model_tags[0].auto_generated);
    }

    #[tokio::test]
    async fn test_tag_chunk_cap() {
        let store = MemoryStore::new();
        let mut adapter = StubAdapter::default();
        adapter.classify_scripts = vec![vec![("notes", 0.9)]; 6];

        // 60 words at max 12 / overlap 2 yield six eligible chunks; only
        // the first five are classified.
        let content = numbered_words(60);
        let result = generate_tags(&store, &adapter, "ws", Some(&content), two_chunk_params())
            .await
            .unwrap();

        assert_eq!(result.chunks_analyzed, MAX_TAG_CHUNKS);
        assert_eq!(adapter.call_count(), MAX_TAG_CHUNKS);
    }

    #[tokio::test]
    async fn test_tags_truncate_to_ten() {
        let store = MemoryStore::new();
        let mut adapter = StubAdapter::default();
        let script: Vec<(&'static str, f32)> = TAG_VOCABULARY[..12]
            .iter()
            .enumerate()
            .map(|(i, l)| (*l, 0.9 - 0.01 * i as f32))
            .collect();
        adapter.classify_scripts = vec![script];

        let content = numbered_words(12);
        let result = generate_tags(&store, &adapter, "ws", Some(&content), two_chunk_params())
            .await
            .unwrap();

        assert_eq!(result.tags.len(), MAX_TAGS);
        assert!(result.tags.iter().all(|t| t.kind.is_none()));
        for pair in result.tags.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[tokio::test]
    async fn test_keyword_backfill_marks_type_and_dedups() {
        let store = MemoryStore::new();
        let mut adapter = StubAdapter::default();
        adapter.classify_scripts = vec![vec![("research", 0.9)]];

        // "research" dominates the keyword counts too, so the backfill
        // must skip it rather than duplicate the model tag.
        let content = "research research research pipeline pipeline deployment \
                       schedule roadmap budget staffing onboarding milestones";
        let result = generate_tags(&store, &adapter, "ws", Some(content), two_chunk_params())
            .await
            .unwrap();

        assert_eq!(result.keywords[0], "research");
        let model_tags: Vec<&str> = result
            .tags
            .iter()
            .filter(|t| t.kind.is_none())
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(model_tags, vec!["research"]);

        let keyword_tags: Vec<&GeneratedTag> = result
            .tags
            .iter()
            .filter(|t| t.kind.as_deref() == Some("keyword"))
            .collect();
        assert_eq!(keyword_tags.len(), MAX_KEYWORD_TAGS);
        assert!(keyword_tags.iter().all(|t| t.name != "research"));
        assert!(keyword_tags
            .iter()
            .all(|t| (t.confidence - KEYWORD_TAG_CONFIDENCE).abs() < 1e-6));
    }

    #[tokio::test]
    async fn test_tagging_model_unavailable() {
        let store = MemoryStore::new();
        let adapter = StubAdapter::unavailable();

        let content = numbered_words(12);
        let err = generate_tags(&store, &adapter, "ws", Some(&content), two_chunk_params())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Auto-tagging model not available");
    }

    #[tokio::test]
    async fn test_empty_content_reports_summary_without_model_calls() {
        let store = MemoryStore::new();
        let adapter = StubAdapter::default();

        let result = generate_tags(&store, &adapter, "ws", None, ChunkParams::default())
            .await
            .unwrap();
        assert!(result.tags.is_empty());
        assert!(result.keywords.is_empty());
        assert_eq!(result.chunks_analyzed, 0);
        assert_eq!(adapter.call_count(), 0);
    }
}
