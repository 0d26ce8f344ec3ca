//! Error types for the `ragqa` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while answering a query.
#[derive(Debug, Error)]
pub enum RagError {
    /// The caller supplied unusable input, such as an empty query.
    ///
    /// Raised before any provider is contacted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The embedding provider failed (network, auth, rate limit, ...).
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The completion provider failed (network, auth, invalid model, ...).
    #[error("Completion error ({provider}): {message}")]
    Completion {
        /// The completion provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// Two vectors of different lengths were compared.
    #[error("Dimension mismatch: cannot compare vectors of length {left} and {right}")]
    DimensionMismatch {
        /// Length of the left-hand vector.
        left: usize,
        /// Length of the right-hand vector.
        right: usize,
    },

    /// The corpus collaborator could not list or read a document.
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The query did not finish within the configured deadline.
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),
}

impl RagError {
    /// Whether this error originated in the embedding or completion provider.
    pub fn is_provider_error(&self) -> bool {
        matches!(self, Self::Embedding { .. } | Self::Completion { .. })
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
