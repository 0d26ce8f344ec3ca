//! # ragqa
//!
//! Retrieval-augmented question answering over a plain-text corpus.
//!
//! ## Overview
//!
//! Given a question and a set of documents, ragqa embeds the question and
//! every document, keeps the five documents most similar to the question
//! (cosine similarity), and asks a chat model to answer using only those
//! documents as context.
//!
//! - [`EmbeddingProvider`] / [`CompletionProvider`] - capability traits for
//!   the external model services
//! - [`cosine_similarity`] - vector scoring
//! - [`Retriever`] - concurrent embedding and top-k ranking
//! - [`Synthesizer`] - grounded prompt construction and answer generation
//! - [`RagPipeline`] - the query-to-answer entry point
//! - [`Corpus`] - collaborators that supply document text
//!
//! Nothing is cached: each query re-embeds the whole corpus.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ragqa::openai::{OpenAICompletionProvider, OpenAIEmbeddingProvider};
//! use ragqa::{Document, RagConfig, RagPipeline};
//!
//! let config = RagConfig::from_env()?;
//! let pipeline = RagPipeline::builder()
//!     .config(&config)
//!     .embedding_provider(Arc::new(OpenAIEmbeddingProvider::from_config(&config)?))
//!     .completion_provider(Arc::new(OpenAICompletionProvider::from_config(&config)?))
//!     .build()?;
//!
//! let corpus = vec![Document::from("Paris is the capital of France.")];
//! let answer = pipeline
//!     .answer_with_config("What is the capital of France?", &corpus, &config)
//!     .await?;
//! ```
//!
//! ## Features
//!
//! - `openai` - [`openai::OpenAIEmbeddingProvider`] and
//!   [`openai::OpenAICompletionProvider`] for OpenAI-compatible APIs

pub mod completion;
pub mod config;
pub mod corpus;
pub mod document;
pub mod embedding;
pub mod error;
pub mod mock;
pub mod pipeline;
pub mod retriever;
pub mod similarity;
pub mod synthesizer;

#[cfg(feature = "openai")]
pub mod openai;

pub use completion::{
    ChatMessage, CompletionChoice, CompletionMessage, CompletionProvider, CompletionRequest,
    CompletionResponse,
};
pub use config::{ChatModel, RagConfig, RagConfigBuilder};
pub use corpus::{Corpus, DirectoryCorpus, DocumentHandle, InMemoryCorpus, load_documents};
pub use document::{Document, RetrievalResult, ScoredDocument};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use retriever::{DEFAULT_MAX_CONCURRENCY, DEFAULT_TOP_K, Retriever};
pub use similarity::{DEGENERATE_SIMILARITY, cosine_similarity};
pub use synthesizer::{NO_RESPONSE_SENTINEL, SynthesisRequest, Synthesizer, build_prompt};
