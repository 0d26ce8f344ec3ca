//! Query-to-answer orchestration.
//!
//! The [`RagPipeline`] validates the query, retrieves the top-ranked corpus
//! documents with a [`Retriever`], then asks a [`Synthesizer`] for an answer
//! grounded in them. Retrieval always finishes before synthesis starts.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragqa::{Document, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .embedding_provider(Arc::new(embedder))
//!     .completion_provider(Arc::new(completer))
//!     .build()?;
//!
//! let corpus = vec![Document::from("Paris is the capital of France.")];
//! let answer = pipeline
//!     .answer_query("What is the capital of France?", &corpus, "gpt-4o-mini")
//!     .await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, Span, error, field, info, info_span};
use uuid::Uuid;

use crate::completion::CompletionProvider;
use crate::config::RagConfig;
use crate::corpus::{Corpus, load_documents};
use crate::document::Document;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::retriever::Retriever;
use crate::synthesizer::{SynthesisRequest, Synthesizer};

/// The query-to-answer orchestrator.
///
/// Holds no state between queries; every call re-embeds the corpus it is
/// given. Construct one via [`RagPipeline::builder()`].
#[derive(Clone)]
pub struct RagPipeline {
    retriever: Retriever,
    synthesizer: Synthesizer,
    timeout: Option<Duration>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }

    /// Answer `query` from `corpus` using the chat model `model`.
    ///
    /// The model identifier is passed to the completion provider as-is.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] if `query` is blank; no provider is called.
    /// - Provider errors from retrieval or synthesis, unchanged.
    /// - [`RagError::Timeout`] if a timeout is configured and expires.
    pub async fn answer_query(
        &self,
        query: &str,
        corpus: &[Document],
        model: &str,
    ) -> Result<String> {
        validate_query(query)?;

        let span = query_span(query, model);
        span.record("corpus.size", corpus.len());
        self.with_deadline(self.run(query, corpus, model)).instrument(span).await
    }

    /// Materialize `corpus` through its collaborator, then answer `query`.
    ///
    /// The query is validated before the corpus is read. Reading the corpus
    /// runs inside the query span and counts against the timeout.
    pub async fn answer_from_corpus(
        &self,
        query: &str,
        corpus: &dyn Corpus,
        model: &str,
    ) -> Result<String> {
        validate_query(query)?;

        let span = query_span(query, model);
        let root = span.clone();
        let answer = async move {
            let documents = load_documents(corpus).instrument(info_span!("rag.load_corpus")).await?;
            root.record("corpus.size", documents.len());
            self.run(query, &documents, model).await
        };
        self.with_deadline(answer).instrument(span).await
    }

    /// Answer `query` with the model selected in `config`.
    pub async fn answer_with_config(
        &self,
        query: &str,
        corpus: &[Document],
        config: &RagConfig,
    ) -> Result<String> {
        self.answer_query(query, corpus, config.selected_model.as_str()).await
    }

    async fn run(&self, query: &str, corpus: &[Document], model: &str) -> Result<String> {
        // 1. Retrieve (fully completes before synthesis begins)
        let retrieved =
            self.retriever.retrieve(query, corpus).instrument(info_span!("rag.retrieve")).await?;
        let context = retrieved.into_documents();

        // 2. Synthesize
        let answer = self
            .synthesizer
            .synthesize_request(SynthesisRequest::new(query, context, model))
            .instrument(info_span!("rag.synthesize"))
            .await?;

        info!(answer_len = answer.len(), "query answered");
        Ok(answer)
    }

    async fn with_deadline<F>(&self, fut: F) -> Result<String>
    where
        F: Future<Output = Result<String>>,
    {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.unwrap_or_else(|_| {
                error!(timeout_ms = limit.as_millis() as u64, "query timed out");
                Err(RagError::Timeout(limit))
            }),
            None => fut.await,
        }
    }
}

/// Root span of one query; `corpus.size` is recorded once the corpus is known.
fn query_span(query: &str, model: &str) -> Span {
    info_span!(
        "rag.answer_query",
        query.id = %Uuid::new_v4(),
        query.len = query.len(),
        corpus.size = field::Empty,
        model
    )
}

fn validate_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(RagError::InvalidInput("query must not be empty".to_string()));
    }
    Ok(())
}

/// Builder for constructing a [`RagPipeline`].
///
/// Both providers are required. Call [`build()`](RagPipelineBuilder::build)
/// to validate and produce the pipeline.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = RagPipeline::builder()
///     .embedding_provider(Arc::new(embedder))
///     .completion_provider(Arc::new(completer))
///     .timeout(Duration::from_secs(30))  // optional
///     .build()?;
/// ```
#[derive(Default)]
pub struct RagPipelineBuilder {
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    completion_provider: Option<Arc<dyn CompletionProvider>>,
    top_k: Option<usize>,
    max_concurrency: Option<usize>,
    timeout: Option<Duration>,
}

impl RagPipelineBuilder {
    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the completion provider.
    pub fn completion_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.completion_provider = Some(provider);
        self
    }

    /// Override the number of context documents.
    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Override the document embedding concurrency.
    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = Some(n);
        self
    }

    /// Bound the duration of each query.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Apply the retrieval and timeout settings from `config`.
    ///
    /// A config without a timeout leaves any earlier [`timeout`](Self::timeout)
    /// in place.
    pub fn config(mut self, config: &RagConfig) -> Self {
        self.top_k = Some(config.top_k);
        self.max_concurrency = Some(config.max_concurrency);
        if let Some(timeout) = config.timeout() {
            self.timeout = Some(timeout);
        }
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a provider is missing or a limit is zero.
    pub fn build(self) -> Result<RagPipeline> {
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let completion_provider = self
            .completion_provider
            .ok_or_else(|| RagError::Config("completion_provider is required".to_string()))?;

        let mut retriever = Retriever::new(embedding_provider);
        if let Some(k) = self.top_k {
            retriever = retriever.with_top_k(k)?;
        }
        if let Some(n) = self.max_concurrency {
            retriever = retriever.with_max_concurrency(n)?;
        }

        Ok(RagPipeline {
            retriever,
            synthesizer: Synthesizer::new(completion_provider),
            timeout: self.timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::InMemoryCorpus;
    use crate::mock::{MockCompletionProvider, MockEmbeddingProvider};

    fn pipeline(
        embedder: Arc<MockEmbeddingProvider>,
        completer: Arc<MockCompletionProvider>,
    ) -> RagPipeline {
        RagPipeline::builder()
            .embedding_provider(embedder)
            .completion_provider(completer)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_both_providers() {
        let err = RagPipeline::builder()
            .completion_provider(Arc::new(MockCompletionProvider::with_answer("x")))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RagError::Config(_)));

        let err = RagPipeline::builder()
            .embedding_provider(Arc::new(MockEmbeddingProvider::new(4)))
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[tokio::test]
    async fn blank_query_is_rejected_before_any_call() {
        let embedder = Arc::new(MockEmbeddingProvider::new(4));
        let completer = Arc::new(MockCompletionProvider::with_answer("unused"));
        let pipeline = pipeline(embedder.clone(), completer.clone());

        for query in ["", "   "] {
            let err = pipeline.answer_query(query, &["doc".into()], "gpt-4o").await.unwrap_err();
            assert!(matches!(err, RagError::InvalidInput(_)));
        }

        assert_eq!(embedder.call_count(), 0);
        assert_eq!(completer.call_count(), 0);
    }

    #[tokio::test]
    async fn embedding_failure_skips_synthesis() {
        let embedder = Arc::new(MockEmbeddingProvider::new(4).fail_on("b"));
        let completer = Arc::new(MockCompletionProvider::with_answer("unused"));
        let pipeline = pipeline(embedder, completer.clone());

        let err = pipeline
            .answer_query("question", &["a".into(), "b".into(), "c".into()], "gpt-4o")
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::Embedding { .. }));
        assert_eq!(completer.call_count(), 0);
    }

    #[tokio::test]
    async fn model_is_passed_through_unvalidated() {
        let completer = Arc::new(MockCompletionProvider::with_answer("ok"));
        let pipeline = pipeline(Arc::new(MockEmbeddingProvider::new(4)), completer.clone());

        pipeline.answer_query("q", &[], "not-a-real-model").await.unwrap();

        assert_eq!(completer.requests()[0].model, "not-a-real-model");
    }

    #[tokio::test]
    async fn empty_corpus_still_synthesizes() {
        let completer = Arc::new(MockCompletionProvider::with_answer("I don't know"));
        let pipeline = pipeline(Arc::new(MockEmbeddingProvider::new(4)), completer.clone());

        let answer = pipeline.answer_query("q", &[], "gpt-4o-mini").await.unwrap();

        assert_eq!(answer, "I don't know");
        assert_eq!(
            completer.requests()[0].messages[0].content,
            "Context:\n\n\nQuestion: q\nAnswer:"
        );
    }

    #[tokio::test]
    async fn answers_from_corpus_collaborator() {
        let completer = Arc::new(MockCompletionProvider::with_answer("Paris"));
        let pipeline = pipeline(Arc::new(MockEmbeddingProvider::new(8)), completer.clone());
        let corpus = InMemoryCorpus::new(["Paris is the capital of France."]);

        let answer = pipeline.answer_from_corpus("capital?", &corpus, "gpt-4o").await.unwrap();

        assert_eq!(answer, "Paris");
        assert!(completer.requests()[0].messages[0].content.contains("Paris is the capital"));
    }

    #[tokio::test]
    async fn uses_configured_model() {
        let completer = Arc::new(MockCompletionProvider::with_answer("ok"));
        let pipeline = pipeline(Arc::new(MockEmbeddingProvider::new(4)), completer.clone());
        let config = RagConfig::builder()
            .api_key("sk-test")
            .selected_model(crate::config::ChatModel::Gpt4Turbo)
            .build()
            .unwrap();

        pipeline.answer_with_config("q", &["d".into()], &config).await.unwrap();

        assert_eq!(completer.requests()[0].model, "gpt-4-turbo");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_query_times_out() {
        let embedder = Arc::new(
            MockEmbeddingProvider::new(4).with_delay("stuck", Duration::from_secs(60)),
        );
        let completer = Arc::new(MockCompletionProvider::with_answer("unused"));
        let pipeline = RagPipeline::builder()
            .embedding_provider(embedder)
            .completion_provider(completer.clone())
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        let err = pipeline.answer_query("q", &["stuck".into()], "gpt-4o").await.unwrap_err();

        assert!(matches!(err, RagError::Timeout(d) if d == Duration::from_secs(5)));
        assert_eq!(completer.call_count(), 0);
    }

    /// Lists one document and never finishes reading it within a minute.
    struct StalledCorpus;

    #[async_trait::async_trait]
    impl Corpus for StalledCorpus {
        async fn list_documents(&self) -> Result<Vec<crate::corpus::DocumentHandle>> {
            Ok(vec![crate::corpus::DocumentHandle::new("slow")])
        }

        async fn read(&self, _handle: &crate::corpus::DocumentHandle) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("late".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_corpus_read_counts_against_timeout() {
        let embedder = Arc::new(MockEmbeddingProvider::new(4));
        let completer = Arc::new(MockCompletionProvider::with_answer("unused"));
        let pipeline = RagPipeline::builder()
            .embedding_provider(embedder.clone())
            .completion_provider(completer.clone())
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        let err = pipeline.answer_from_corpus("q", &StalledCorpus, "gpt-4o").await.unwrap_err();

        assert!(matches!(err, RagError::Timeout(d) if d == Duration::from_secs(5)));
        assert_eq!(embedder.call_count(), 0);
        assert_eq!(completer.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn config_without_timeout_keeps_explicit_timeout() {
        let embedder = Arc::new(
            MockEmbeddingProvider::new(4).with_delay("stuck", Duration::from_secs(60)),
        );
        let config = RagConfig::builder().api_key("sk-test").top_k(3).build().unwrap();
        assert_eq!(config.timeout(), None);

        let pipeline = RagPipeline::builder()
            .embedding_provider(embedder)
            .completion_provider(Arc::new(MockCompletionProvider::with_answer("unused")))
            .timeout(Duration::from_secs(5))
            .config(&config)
            .build()
            .unwrap();

        assert_eq!(pipeline.retriever().top_k(), 3);
        let err = pipeline.answer_query("q", &["stuck".into()], "gpt-4o").await.unwrap_err();
        assert!(matches!(err, RagError::Timeout(d) if d == Duration::from_secs(5)));
    }

    #[test]
    fn config_timeout_overrides_explicit_timeout() {
        let config = RagConfig::builder().api_key("sk-test").timeout_secs(2).build().unwrap();

        let pipeline = RagPipeline::builder()
            .embedding_provider(Arc::new(MockEmbeddingProvider::new(4)))
            .completion_provider(Arc::new(MockCompletionProvider::with_answer("unused")))
            .timeout(Duration::from_secs(5))
            .config(&config)
            .build()
            .unwrap();

        assert_eq!(pipeline.timeout, Some(Duration::from_secs(2)));
    }
}
