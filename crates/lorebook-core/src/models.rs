//! Core data models and the output shapes the aggregators produce.
//!
//! [`Document`] is the persistent unit: one page of text owned by exactly
//! one workspace. Everything else here is either ephemeral ([`Chunk`]) or
//! derived per request (suggestions, tag results, graphs).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A page of text owned by one workspace.
///
/// The `embedding`, when present, was computed from the current `content`.
/// [`put_document`](crate::store::WorkspaceStore::put_document) callers must
/// recompute it before storing whenever `content` changes; a document whose
/// embedding is stale is a bug, not an accepted state. Documents without an
/// embedding are excluded from embedding similarity and served by the
/// keyword-overlap fallback instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a document with fresh timestamps and no embedding.
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            tags: Vec::new(),
            embedding: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A bounded text window derived from longer content for model consumption.
/// Produced by the chunker, scored once, then discarded.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    pub source_document_id: Option<String>,
}

/// Relationship band applied to similarity results. Purely a score-banding
/// rule (above 0.6 is "semantic", otherwise "contextual"), not a separate
/// model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Semantic,
    Contextual,
}

/// One suggested cross-document link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSuggestion {
    /// Target document id.
    pub id: String,
    /// Target document title.
    #[serde(rename = "targetPage")]
    pub target_page: String,
    /// Similarity or keyword-overlap score in `[0, 1]`.
    pub confidence: f32,
    /// Human-readable scoring note; distinguishes genuine semantic
    /// similarity from the keyword-overlap fallback.
    pub reason: String,
    /// Content excerpt, at most 153 characters (150 plus an ellipsis).
    pub preview: String,
    #[serde(rename = "type")]
    pub kind: RelationKind,
}

/// One generated tag, either model-derived or keyword-derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedTag {
    pub name: String,
    /// Mean classification confidence (model tags) or the fixed keyword
    /// pseudo-tag confidence, rounded to 3 decimals.
    pub confidence: f32,
    pub auto_generated: bool,
    /// `"keyword"` for frequency-derived pseudo-tags; absent for model tags.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Full auto-tagging result, including the raw keyword list and the
/// analysis summary for observability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagResult {
    pub tags: Vec<GeneratedTag>,
    pub keywords: Vec<String>,
    pub total_content_length: usize,
    pub chunks_analyzed: usize,
}

/// A node in the derived knowledge graph. One per document, regardless of
/// how many edges survive the threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    /// Content length in characters divided by 100; drives node rendering.
    pub size: f32,
    pub tags: Vec<String>,
}

/// An undirected edge between two documents whose similarity exceeds the
/// edge threshold. Emitted once per pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    /// Cosine similarity rounded to 2 decimals.
    pub weight: f32,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Derived graph over one workspace. Recomputed from current document
/// state on every request; never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}
