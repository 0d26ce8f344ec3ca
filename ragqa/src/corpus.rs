//! Corpus collaborators that supply document text at query time.
//!
//! A [`Corpus`] lists opaque [`DocumentHandle`]s and reads each one to a
//! string. [`load_documents`] materializes the whole corpus, in listing
//! order, once per query.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::document::Document;
use crate::error::{RagError, Result};

/// An opaque reference to one document in a [`Corpus`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentHandle(String);

impl DocumentHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A source of documents.
#[async_trait]
pub trait Corpus: Send + Sync {
    /// List every document currently in the corpus.
    async fn list_documents(&self) -> Result<Vec<DocumentHandle>>;

    /// Read the full text of one document.
    async fn read(&self, handle: &DocumentHandle) -> Result<String>;
}

/// Read every document in `corpus`, preserving listing order.
///
/// # Errors
///
/// Fails if listing fails or any single document cannot be read.
pub async fn load_documents(corpus: &dyn Corpus) -> Result<Vec<Document>> {
    let handles = corpus.list_documents().await?;
    debug!(document_count = handles.len(), "reading corpus");

    let texts = try_join_all(handles.iter().map(|handle| corpus.read(handle))).await?;
    info!(document_count = texts.len(), "corpus loaded");
    Ok(texts.into_iter().map(Document::from).collect())
}

/// A corpus held in memory; handles are positional indices.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCorpus {
    texts: Vec<String>,
}

impl InMemoryCorpus {
    pub fn new<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { texts: texts.into_iter().map(Into::into).collect() }
    }
}

#[async_trait]
impl Corpus for InMemoryCorpus {
    async fn list_documents(&self) -> Result<Vec<DocumentHandle>> {
        Ok((0..self.texts.len()).map(|i| DocumentHandle::new(i.to_string())).collect())
    }

    async fn read(&self, handle: &DocumentHandle) -> Result<String> {
        handle
            .as_str()
            .parse::<usize>()
            .ok()
            .and_then(|index| self.texts.get(index))
            .cloned()
            .ok_or_else(|| {
                RagError::Corpus(format!("no document for handle '{}'", handle.as_str()))
            })
    }
}

/// Default file extensions picked up by [`DirectoryCorpus`].
pub const DEFAULT_EXTENSIONS: [&str; 2] = ["md", "txt"];

/// A corpus of text files under a directory, searched recursively.
///
/// Handles are paths relative to the root, listed in sorted order so the
/// corpus order is stable between runs.
#[derive(Debug, Clone)]
pub struct DirectoryCorpus {
    root: PathBuf,
    extensions: Vec<String>,
}

impl DirectoryCorpus {
    /// Create a corpus over `.md` and `.txt` files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        }
    }

    /// Replace the accepted file extensions (without the leading dot).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions.iter().any(|accepted| accepted.eq_ignore_ascii_case(ext))
            })
    }

    async fn collect_files(&self, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
        let mut pending = vec![dir.to_path_buf()];
        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| {
                error!(path = %dir.display(), error = %e, "failed to list directory");
                RagError::Corpus(format!("failed to list '{}': {e}", dir.display()))
            })?;
            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                RagError::Corpus(format!("failed to list '{}': {e}", dir.display()))
            })? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|e| {
                    RagError::Corpus(format!("failed to inspect '{}': {e}", path.display()))
                })?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() && self.accepts(&path) {
                    out.push(path);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Corpus for DirectoryCorpus {
    async fn list_documents(&self) -> Result<Vec<DocumentHandle>> {
        let mut files = Vec::new();
        self.collect_files(&self.root, &mut files).await?;

        let mut handles: Vec<DocumentHandle> = files
            .iter()
            .filter_map(|path| path.strip_prefix(&self.root).ok())
            .map(|relative| DocumentHandle::new(relative.to_string_lossy()))
            .collect();
        handles.sort();
        Ok(handles)
    }

    async fn read(&self, handle: &DocumentHandle) -> Result<String> {
        let relative = Path::new(handle.as_str());
        if relative.is_absolute() || relative.components().any(|c| c.as_os_str() == "..") {
            return Err(RagError::Corpus(format!(
                "handle '{}' escapes the corpus root",
                handle.as_str()
            )));
        }

        let path = self.root.join(relative);
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to read document");
            RagError::Corpus(format!("failed to read '{}': {e}", path.display()))
        })
    }
}
