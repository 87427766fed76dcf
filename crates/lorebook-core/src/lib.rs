//! # Lorebook Core
//!
//! Shared logic for Lorebook: data models, chunking, keyword extraction,
//! the model-adapter capability trait, score aggregation, the similarity
//! index, the knowledge-graph builder, and the workspace store abstraction.
//!
//! This crate contains no HTTP, filesystem I/O, or process concerns. The
//! application shell injects a [`store::WorkspaceStore`] and an
//! [`adapter::ModelAdapter`] and calls the aggregation entry points in
//! [`aggregate`].
//!
//! All three AI features share one shape: split content into bounded
//! chunks, score each chunk (or document) through a model capability,
//! then threshold, rank, and truncate the scores into a single result.

pub mod adapter;
pub mod aggregate;
pub mod chunk;
pub mod error;
pub mod graph;
pub mod keywords;
pub mod models;
pub mod similarity;
pub mod store;

pub use error::{Error, Result};
