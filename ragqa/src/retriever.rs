//! Top-k retrieval over an in-memory corpus.
//!
//! The [`Retriever`] embeds the query and every corpus document, scores each
//! document by cosine similarity to the query, and keeps the best `k`.
//! Nothing is cached between calls: every retrieval re-embeds the corpus.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, error, info};

use crate::document::{Document, RetrievalResult, ScoredDocument};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::similarity::cosine_similarity;

/// Number of documents returned by a retrieval.
pub const DEFAULT_TOP_K: usize = 5;

/// Upper bound on document embedding calls in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Ranks corpus documents against a query by embedding similarity.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use ragqa::{Document, Retriever};
///
/// let retriever = Retriever::new(Arc::new(embedder));
/// let corpus = vec![Document::from("Paris is the capital of France.")];
/// let result = retriever.retrieve("What is the capital of France?", &corpus).await?;
/// ```
#[derive(Clone)]
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    top_k: usize,
    max_concurrency: usize,
}

impl Retriever {
    /// Create a retriever returning [`DEFAULT_TOP_K`] documents.
    pub fn new(embedding_provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedding_provider, top_k: DEFAULT_TOP_K, max_concurrency: DEFAULT_MAX_CONCURRENCY }
    }

    /// Override the number of documents kept.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `top_k` is zero.
    pub fn with_top_k(mut self, top_k: usize) -> Result<Self> {
        if top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        self.top_k = top_k;
        Ok(self)
    }

    /// Override how many document embeddings may be requested concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `max_concurrency` is zero.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Result<Self> {
        if max_concurrency == 0 {
            return Err(RagError::Config("max_concurrency must be greater than zero".to_string()));
        }
        self.max_concurrency = max_concurrency;
        Ok(self)
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Return the `top_k` corpus documents most similar to `query`.
    ///
    /// Documents are ordered by descending score; equal scores keep their
    /// corpus order. An empty corpus yields an empty result.
    ///
    /// # Errors
    ///
    /// Fails as a whole if the query or any single document cannot be
    /// embedded; no partial ranking is returned. Returns
    /// [`RagError::DimensionMismatch`] if the provider returns vectors of
    /// differing lengths.
    pub async fn retrieve(&self, query: &str, corpus: &[Document]) -> Result<RetrievalResult> {
        // 1. Embed the query
        let query_embedding = self.embedding_provider.embed(query).await.inspect_err(|e| {
            error!(error = %e, "embedding failed for query");
        })?;

        // 2. Embed every document (fan-out, then join)
        let embeddings = self.embed_corpus(corpus).await?;

        // 3. Score against the query
        let mut hits = Vec::with_capacity(corpus.len());
        for (position, (document, embedding)) in corpus.iter().zip(embeddings).enumerate() {
            let score = cosine_similarity(&query_embedding, &embedding)?;
            hits.push(ScoredDocument { document: document.clone(), score, position });
        }

        // 4. Rank and keep the best
        rank(&mut hits, self.top_k);

        info!(corpus_size = corpus.len(), result_count = hits.len(), "retrieval completed");
        Ok(RetrievalResult::new(hits))
    }

    /// Embed every document, returning vectors in corpus order.
    ///
    /// Calls complete in any order; each vector is matched back to its
    /// document by index. The first failure aborts the remaining calls.
    async fn embed_corpus(&self, corpus: &[Document]) -> Result<Vec<Vec<f32>>> {
        let provider = &self.embedding_provider;
        let mut indexed: Vec<(usize, Vec<f32>)> = stream::iter(corpus.iter().enumerate())
            .map(|(index, document)| async move {
                debug!(
                    document.position = index,
                    text_len = document.text().len(),
                    "embedding document"
                );
                provider
                    .embed(document.text())
                    .await
                    .map(|embedding| (index, embedding))
                    .inspect_err(|e| {
                        error!(
                            document.position = index,
                            error = %e,
                            "embedding failed for document"
                        );
                    })
            })
            .buffer_unordered(self.max_concurrency)
            .try_collect()
            .await?;

        indexed.sort_unstable_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().map(|(_, embedding)| embedding).collect())
    }
}

/// Sort hits by descending score, keeping corpus order for ties, and keep
/// the first `top_k`.
fn rank(hits: &mut Vec<ScoredDocument>, top_k: usize) {
    // `sort_by` is stable, which is what keeps equal scores in corpus order.
    hits.sort_by(by_descending_score);
    hits.truncate(top_k);
}

/// Total order on hits: higher scores first, NaN scores after every number.
fn by_descending_score(a: &ScoredDocument, b: &ScoredDocument) -> Ordering {
    match (a.score.is_nan(), b.score.is_nan()) {
        (false, false) => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    }
}
