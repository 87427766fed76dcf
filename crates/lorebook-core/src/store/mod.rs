//! Workspace storage abstraction.
//!
//! The [`WorkspaceStore`] trait defines the document operations the
//! aggregators and graph builder depend on, so they hold a capability
//! rather than reaching into process-wide state. Backends are pluggable:
//! the in-memory store here, the filesystem store in the application crate,
//! and test doubles.
//!
//! Workspaces are created lazily (ensure-or-create) and never implicitly
//! destroyed. Creation is idempotent and safe under concurrent calls with
//! the same name.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::Error;
use crate::models::Document;

pub use memory::MemoryStore;

/// Reduce a workspace name to alphanumerics, hyphens, and underscores.
///
/// Rejects names that sanitize to nothing — there is no valid directory or
/// key to shard them under.
pub fn sanitize_workspace_name(name: &str) -> std::result::Result<String, Error> {
    let safe: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if safe.is_empty() {
        return Err(Error::InvalidInput("Invalid workspace name".into()));
    }
    Ok(safe)
}

/// Abstract document storage, sharded by workspace name.
///
/// Implementations must be `Send + Sync`. Document iteration order must be
/// stable between calls — the aggregators' tie-break rules are defined in
/// terms of it.
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    /// Create the workspace if it does not exist. Idempotent. Returns the
    /// sanitized name actually used for sharding.
    async fn ensure_workspace(&self, name: &str) -> Result<String>;

    /// All workspace names known to the store.
    async fn list_workspaces(&self) -> Result<Vec<String>>;

    /// All documents in a workspace, in stable iteration order. An unknown
    /// workspace yields an empty list (lazy-create semantics).
    async fn list_documents(&self, workspace: &str) -> Result<Vec<Document>>;

    /// One document by id, or `None`.
    async fn get_document(&self, workspace: &str, id: &str) -> Result<Option<Document>>;

    /// Insert or replace a document. Callers are responsible for having
    /// recomputed `embedding` whenever `content` changed. Returns the
    /// document id.
    async fn put_document(&self, workspace: &str, doc: &Document) -> Result<String>;

    /// Delete a document. Returns whether it existed.
    async fn delete_document(&self, workspace: &str, id: &str) -> Result<bool>;
}
