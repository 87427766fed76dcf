//! Page ingestion helpers shared by the HTTP server and the CLI.
//!
//! The one rule that matters here: embedding is synchronous relative to
//! content mutation. A page is written with an embedding computed from the
//! content being written, or with none at all — a reader can never observe
//! an embedding computed from different content than the current field.

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use lorebook_core::adapter::{AdapterError, ModelAdapter};
use lorebook_core::models::Document;
use lorebook_core::store::{MemoryStore, WorkspaceStore};
use lorebook_core::{Error, Result};

use crate::config::Config;
use crate::store_fs::{allowed_extension, FsWorkspaceStore};

/// Build the configured workspace store: filesystem when `store.root` is
/// set, volatile memory otherwise.
pub fn build_store(config: &Config) -> anyhow::Result<Arc<dyn WorkspaceStore>> {
    Ok(match &config.store.root {
        Some(root) => Arc::new(FsWorkspaceStore::new(root)?),
        None => Arc::new(MemoryStore::new()),
    })
}

/// Embed `content`, degrading to `None` when the capability is missing or
/// the call fails. The page write itself must still succeed; a document
/// without an embedding takes the keyword fallback path.
async fn embed_content(adapter: &dyn ModelAdapter, content: &str) -> Option<Vec<f32>> {
    match adapter.embed(content).await {
        Ok(vec) => Some(vec),
        Err(AdapterError::Unavailable(_)) => None,
        Err(AdapterError::Call(e)) => {
            warn!(error = %e, "embedding failed; storing page without one");
            None
        }
    }
}

/// Create a page in `workspace`, embedding its content before the write
/// returns. Returns the new page id.
pub async fn add_page(
    store: &dyn WorkspaceStore,
    adapter: &dyn ModelAdapter,
    workspace: &str,
    title: &str,
    content: &str,
    tags: Vec<String>,
) -> Result<String> {
    store.ensure_workspace(workspace).await?;

    let mut doc = Document::new(Uuid::new_v4().to_string(), title, content);
    doc.tags = tags;
    doc.embedding = embed_content(adapter, content).await;

    let id = store.put_document(workspace, &doc).await?;
    Ok(id)
}

/// Apply a partial update to a page. A content change recomputes the
/// embedding before the write; title/tag-only changes keep the stored one.
pub async fn update_page(
    store: &dyn WorkspaceStore,
    adapter: &dyn ModelAdapter,
    workspace: &str,
    id: &str,
    title: Option<&str>,
    content: Option<&str>,
    tags: Option<Vec<String>>,
) -> Result<Document> {
    let mut doc = store
        .get_document(workspace, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Page {}", id)))?;

    if let Some(title) = title {
        doc.title = title.to_string();
    }
    if let Some(content) = content {
        doc.content = content.to_string();
        doc.embedding = embed_content(adapter, content).await;
    }
    if let Some(tags) = tags {
        doc.tags = tags;
    }
    doc.updated_at = chrono::Utc::now();

    store.put_document(workspace, &doc).await?;
    Ok(doc)
}

/// Ingest an uploaded file as a page. Only `.txt` and `.md` files are
/// accepted; the file stem becomes the page id, so re-uploading a file
/// replaces its page.
pub async fn upload_file(
    store: &dyn WorkspaceStore,
    adapter: &dyn ModelAdapter,
    workspace: &str,
    filename: &str,
    content: &str,
) -> Result<String> {
    if !allowed_extension(filename) {
        return Err(Error::InvalidInput(
            "File type not allowed. Only .txt and .md files are supported.".to_string(),
        ));
    }

    store.ensure_workspace(workspace).await?;

    let stem = std::path::Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);

    let mut doc = Document::new(stem, filename, content);
    doc.tags = vec!["uploaded".to_string()];
    doc.embedding = embed_content(adapter, content).await;

    let id = store.put_document(workspace, &doc).await?;
    Ok(id)
}
