//! Knowledge-graph builder.
//!
//! Derives a node/edge graph over one workspace's documents by thresholding
//! the all-pairs similarity sweep. Every document contributes a node; an
//! undirected edge appears once per pair whose cosine similarity strictly
//! exceeds the edge threshold. The graph represents the full thresholded
//! adjacency — no truncation — and is recomputed from current document
//! state on every request, so there is nothing to invalidate.

use crate::models::{Document, GraphEdge, GraphNode, KnowledgeGraph};
use crate::similarity::SimilarityIndex;

/// Pairs must score strictly above this to become an edge. Distinct from
/// the suggestion threshold; the two are not interchangeable.
pub const EDGE_SIMILARITY_THRESHOLD: f32 = 0.4;

fn round2(x: f32) -> f32 {
    (x * 100.0).round() / 100.0
}

/// Build the graph for a workspace's documents.
///
/// Documents without an embedding still appear as nodes but never in
/// edges. Node size scales with content length (characters / 100).
pub fn build_graph(documents: &[Document]) -> KnowledgeGraph {
    let nodes = documents
        .iter()
        .map(|d| GraphNode {
            id: d.id.clone(),
            label: d.title.clone(),
            size: d.content.chars().count() as f32 / 100.0,
            tags: d.tags.clone(),
        })
        .collect();

    let index = SimilarityIndex::from_documents(documents.iter());
    let edges = index
        .pairs(EDGE_SIMILARITY_THRESHOLD)
        .into_iter()
        .map(|(source, target, score)| GraphEdge {
            source,
            target,
            weight: round2(score),
            kind: "semantic".to_string(),
        })
        .collect();

    KnowledgeGraph { nodes, edges }
}
