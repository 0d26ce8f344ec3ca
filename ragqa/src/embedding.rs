//! Embedding provider trait for turning text into vectors.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates a vector embedding for a piece of text.
///
/// Each call to [`embed`](EmbeddingProvider::embed) is one round trip to the
/// backing service. Callers get no batching, deduplication or caching; the
/// vector length is whatever the provider's model produces and is not
/// checked here.
///
/// Failures (network, auth, rate limiting) are returned as
/// [`RagError::Embedding`](crate::RagError::Embedding) and are never retried.
///
/// # Example
///
/// ```rust,ignore
/// use ragqa::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    ///
    /// Empty input is forwarded to the provider as-is.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// The embedding model this provider requests.
    fn model(&self) -> &str;
}
