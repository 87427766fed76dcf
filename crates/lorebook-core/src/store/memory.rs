//! In-memory [`WorkspaceStore`] implementation.
//!
//! Documents live in insertion-ordered `Vec`s behind a `std::sync::RwLock`,
//! sharded by sanitized workspace name. Insertion order is the stable
//! iteration order the aggregators' tie-breaks rely on; replacing a
//! document keeps its position.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Document;

use super::{sanitize_workspace_name, WorkspaceStore};

/// Volatile process-memory store.
#[derive(Default)]
pub struct MemoryStore {
    workspaces: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkspaceStore for MemoryStore {
    async fn ensure_workspace(&self, name: &str) -> Result<String> {
        let safe = sanitize_workspace_name(name)?;
        let mut guard = self.workspaces.write().unwrap();
        guard.entry(safe.clone()).or_default();
        Ok(safe)
    }

    async fn list_workspaces(&self) -> Result<Vec<String>> {
        let guard = self.workspaces.read().unwrap();
        let mut names: Vec<String> = guard.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn list_documents(&self, workspace: &str) -> Result<Vec<Document>> {
        let safe = sanitize_workspace_name(workspace)?;
        let guard = self.workspaces.read().unwrap();
        Ok(guard.get(&safe).cloned().unwrap_or_default())
    }

    async fn get_document(&self, workspace: &str, id: &str) -> Result<Option<Document>> {
        let safe = sanitize_workspace_name(workspace)?;
        let guard = self.workspaces.read().unwrap();
        Ok(guard
            .get(&safe)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned()))
    }

    async fn put_document(&self, workspace: &str, doc: &Document) -> Result<String> {
        let safe = sanitize_workspace_name(workspace)?;
        let mut guard = self.workspaces.write().unwrap();
        let docs = guard.entry(safe).or_default();
        match docs.iter_mut().find(|d| d.id == doc.id) {
            Some(existing) => *existing = doc.clone(),
            None => docs.push(doc.clone()),
        }
        Ok(doc.id.clone())
    }

    async fn delete_document(&self, workspace: &str, id: &str) -> Result<bool> {
        let safe = sanitize_workspace_name(workspace)?;
        let mut guard = self.workspaces.write().unwrap();
        if let Some(docs) = guard.get_mut(&safe) {
            let before = docs.len();
            docs.retain(|d| d.id != id);
            return Ok(docs.len() != before);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_workspace_idempotent() {
        let store = MemoryStore::new();
        assert_eq!(store.ensure_workspace("notes").await.unwrap(), "notes");
        assert_eq!(store.ensure_workspace("notes").await.unwrap(), "notes");
        assert_eq!(store.list_workspaces().await.unwrap(), vec!["notes"]);
    }

    #[tokio::test]
    async fn test_ensure_workspace_sanitizes() {
        let store = MemoryStore::new();
        assert_eq!(store.ensure_workspace("my notes!").await.unwrap(), "mynotes");
        assert!(store.ensure_workspace("!!!").await.is_err());
    }

    #[tokio::test]
    async fn test_put_get_delete_roundtrip() {
        let store = MemoryStore::new();
        let doc = Document::new("d1", "First", "hello world");
        store.put_document("ws", &doc).await.unwrap();

        let fetched = store.get_document("ws", "d1").await.unwrap().unwrap();
        assert_eq!(fetched.title, "First");

        assert!(store.delete_document("ws", "d1").await.unwrap());
        assert!(!store.delete_document("ws", "d1").await.unwrap());
        assert!(store.get_document("ws", "d1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_in_place() {
        let store = MemoryStore::new();
        store.put_document("ws", &Document::new("a", "A", "1")).await.unwrap();
        store.put_document("ws", &Document::new("b", "B", "2")).await.unwrap();

        let mut updated = Document::new("a", "A2", "3");
        updated.tags = vec!["x".into()];
        store.put_document("ws", &updated).await.unwrap();

        let docs = store.list_documents("ws").await.unwrap();
        assert_eq!(docs.len(), 2);
        // Replaced document keeps its insertion position.
        assert_eq!(docs[0].id, "a");
        assert_eq!(docs[0].title, "A2");
    }

    #[tokio::test]
    async fn test_unknown_workspace_is_empty() {
        let store = MemoryStore::new();
        assert!(store.list_documents("nowhere").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_workspaces_are_isolated() {
        let store = MemoryStore::new();
        store.put_document("one", &Document::new("d", "D", "x")).await.unwrap();
        assert!(store.list_documents("two").await.unwrap().is_empty());
        assert_eq!(store.list_documents("one").await.unwrap().len(), 1);
    }
}
