//! Configuration for answering queries.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::retriever::{DEFAULT_MAX_CONCURRENCY, DEFAULT_TOP_K};

/// Environment variable holding the provider API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable selecting the chat model.
pub const MODEL_ENV: &str = "RAGQA_MODEL";

/// The chat models a caller can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChatModel {
    /// `gpt-4o-mini`: fast, cost-effective.
    #[default]
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
    /// `gpt-4o`: most capable.
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    /// `gpt-4-turbo`: previous generation flagship.
    #[serde(rename = "gpt-4-turbo")]
    Gpt4Turbo,
}

impl ChatModel {
    /// All selectable models.
    pub const ALL: [ChatModel; 3] = [ChatModel::Gpt4oMini, ChatModel::Gpt4o, ChatModel::Gpt4Turbo];

    /// The provider's identifier for this model.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gpt4oMini => "gpt-4o-mini",
            Self::Gpt4o => "gpt-4o",
            Self::Gpt4Turbo => "gpt-4-turbo",
        }
    }
}

impl fmt::Display for ChatModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatModel {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL.into_iter().find(|model| model.as_str() == s).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(ChatModel::as_str).collect();
            RagError::Config(format!("unknown model '{s}', expected one of: {}", known.join(", ")))
        })
    }
}

/// Settings consumed by the pipeline and the OpenAI providers.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Credential for the embedding and completion providers.
    pub api_key: String,
    /// The chat model used for answers.
    pub selected_model: ChatModel,
    /// Number of context documents kept per query.
    pub top_k: usize,
    /// Maximum concurrent document embedding calls.
    pub max_concurrency: usize,
    /// Optional deadline for a whole query, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl fmt::Debug for RagConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RagConfig")
            .field("api_key", &"<redacted>")
            .field("selected_model", &self.selected_model)
            .field("top_k", &self.top_k)
            .field("max_concurrency", &self.max_concurrency)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Load configuration from `OPENAI_API_KEY` and, optionally, `RAGQA_MODEL`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the key is missing or empty, or the
    /// model name is not one of [`ChatModel::ALL`].
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| RagError::Config(format!("{API_KEY_ENV} environment variable not set")))?;
        let mut builder = Self::builder().api_key(api_key);
        if let Ok(model) = std::env::var(MODEL_ENV) {
            builder = builder.selected_model(model.parse()?);
        }
        builder.build()
    }

    /// The query deadline, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone)]
pub struct RagConfigBuilder {
    api_key: Option<String>,
    selected_model: ChatModel,
    top_k: usize,
    max_concurrency: usize,
    timeout_secs: Option<u64>,
}

impl Default for RagConfigBuilder {
    fn default() -> Self {
        Self {
            api_key: None,
            selected_model: ChatModel::default(),
            top_k: DEFAULT_TOP_K,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout_secs: None,
        }
    }
}

impl RagConfigBuilder {
    /// Set the provider API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the chat model used for answers.
    pub fn selected_model(mut self, model: ChatModel) -> Self {
        self.selected_model = model;
        self
    }

    /// Set the number of context documents kept per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Set the maximum number of concurrent document embedding calls.
    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }

    /// Set a deadline for each query.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Build the [`RagConfig`], validating that parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - the API key is missing or empty
    /// - `top_k == 0`
    /// - `max_concurrency == 0`
    /// - `timeout_secs == Some(0)`
    pub fn build(self) -> Result<RagConfig> {
        let api_key = self.api_key.unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(RagError::Config("api_key must not be empty".to_string()));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if self.max_concurrency == 0 {
            return Err(RagError::Config("max_concurrency must be greater than zero".to_string()));
        }
        if self.timeout_secs == Some(0) {
            return Err(RagError::Config("timeout_secs must be greater than zero".to_string()));
        }
        Ok(RagConfig {
            api_key,
            selected_model: self.selected_model,
            top_k: self.top_k,
            max_concurrency: self.max_concurrency,
            timeout_secs: self.timeout_secs,
        })
    }
}
