//! Filesystem-backed workspace store.
//!
//! One directory per workspace under a configured root; one `.txt` or
//! `.md` file per document, with the file stem as the document id and the
//! title derived from it. Flat files hold content only — tags and
//! embeddings are not persisted, so documents loaded from disk take the
//! keyword-overlap similarity path.
//!
//! Unreadable files are logged and skipped; the rest of the listing
//! succeeds. Workspace names are sanitized before touching the
//! filesystem, and `create_dir_all` makes ensure-or-create idempotent
//! under concurrent calls.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;
use walkdir::WalkDir;

use lorebook_core::models::Document;
use lorebook_core::store::{sanitize_workspace_name, WorkspaceStore};

/// The only file types a workspace may contain or accept on upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Whether `filename` carries an allowed workspace file extension.
pub fn allowed_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| ALLOWED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Directory-of-flat-files [`WorkspaceStore`].
pub struct FsWorkspaceStore {
    root: PathBuf,
    include: GlobSet,
}

impl FsWorkspaceStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create workspace root: {}", root.display()))?;

        let mut builder = GlobSetBuilder::new();
        for ext in ALLOWED_EXTENSIONS {
            builder.add(Glob::new(&format!("*.{}", ext))?);
        }
        let include = builder.build()?;

        Ok(Self { root, include })
    }

    fn workspace_dir(&self, workspace: &str) -> Result<PathBuf> {
        let safe = sanitize_workspace_name(workspace)?;
        Ok(self.root.join(safe))
    }

    fn read_document(&self, path: &Path) -> Result<Document> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;

        let modified = file_mtime(path);
        Ok(Document {
            id: stem.clone(),
            title: title_from_stem(&stem),
            content,
            tags: Vec::new(),
            embedding: None,
            created_at: modified,
            updated_at: modified,
        })
    }
}

fn file_mtime(path: &Path) -> DateTime<Utc> {
    let secs = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

/// `"release_notes"` → `"Release Notes"`.
fn title_from_stem(stem: &str) -> String {
    stem.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduce a document id to characters safe in a file stem.
fn sanitize_stem(id: &str) -> Result<String> {
    let safe: String = id
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if safe.is_empty() {
        anyhow::bail!("Invalid document id");
    }
    Ok(safe)
}

#[async_trait]
impl WorkspaceStore for FsWorkspaceStore {
    async fn ensure_workspace(&self, name: &str) -> Result<String> {
        let safe = sanitize_workspace_name(name)?;
        let dir = self.root.join(&safe);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create workspace: {}", dir.display()))?;
        Ok(safe)
    }

    async fn list_workspaces(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn list_documents(&self, workspace: &str) -> Result<Vec<Document>> {
        let dir = self.workspace_dir(workspace)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = WalkDir::new(&dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.file_name()
                    .map(|n| self.include.is_match(Path::new(n)))
                    .unwrap_or(false)
            })
            .collect();
        // Sort for deterministic ordering; tie-breaks depend on it.
        paths.sort();

        let mut docs = Vec::new();
        for path in paths {
            match self.read_document(&path) {
                Ok(doc) => docs.push(doc),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
            }
        }
        Ok(docs)
    }

    async fn get_document(&self, workspace: &str, id: &str) -> Result<Option<Document>> {
        let docs = self.list_documents(workspace).await?;
        Ok(docs.into_iter().find(|d| d.id == id))
    }

    async fn put_document(&self, workspace: &str, doc: &Document) -> Result<String> {
        let safe_ws = self.ensure_workspace(workspace).await?;
        let stem = sanitize_stem(&doc.id)?;
        let path = self.root.join(safe_ws).join(format!("{}.md", stem));
        std::fs::write(&path, &doc.content)
            .with_context(|| format!("Failed to save file: {}", path.display()))?;
        Ok(stem)
    }

    async fn delete_document(&self, workspace: &str, id: &str) -> Result<bool> {
        let dir = self.workspace_dir(workspace)?;
        let stem = sanitize_stem(id)?;
        for ext in ALLOWED_EXTENSIONS {
            let path = dir.join(format!("{}.{}", stem, ext));
            if path.exists() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to delete file: {}", path.display()))?;
                return Ok(true);
            }
        }
        Ok(false)
    }
}
