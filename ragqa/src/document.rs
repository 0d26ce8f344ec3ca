//! Data types for documents and retrieval results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A unit of corpus text.
///
/// Documents carry no identity beyond their content: two documents with the
/// same text are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(String);

impl Document {
    /// Wrap the given text as a document.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The document's text.
    pub fn text(&self) -> &str {
        &self.0
    }

    /// Consume the document, returning its text.
    pub fn into_text(self) -> String {
        self.0
    }
}

impl From<String> for Document {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

impl AsRef<str> for Document {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A [`Document`] paired with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    /// The scored document.
    pub document: Document,
    /// Cosine similarity to the query, in `[-1, 1]`.
    pub score: f32,
    /// Index of the document in the corpus it was retrieved from.
    pub position: usize,
}

/// The top-ranked documents for a query, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    hits: Vec<ScoredDocument>,
}

impl RetrievalResult {
    pub(crate) fn new(hits: Vec<ScoredDocument>) -> Self {
        Self { hits }
    }

    /// The ranked hits, highest score first.
    pub fn hits(&self) -> &[ScoredDocument] {
        &self.hits
    }

    /// Iterate over the ranked documents without their scores.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.hits.iter().map(|hit| &hit.document)
    }

    /// Consume the result, returning the ranked documents.
    pub fn into_documents(self) -> Vec<Document> {
        self.hits.into_iter().map(|hit| hit.document).collect()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}
