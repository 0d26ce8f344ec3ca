//! OpenAI-compatible embedding and completion providers.
//!
//! This module is only available when the `openai` feature is enabled. Both
//! providers call the REST API directly with `reqwest` and work against any
//! server exposing the OpenAI `/embeddings` and `/chat/completions` routes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::completion::{CompletionProvider, CompletionRequest, CompletionResponse};
use crate::config::{API_KEY_ENV, RagConfig};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// The default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// The embedding model used for documents and queries.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

const PROVIDER: &str = "OpenAI";

/// Shared HTTP plumbing for both providers.
#[derive(Clone)]
struct ApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ApiClient {
    fn new(api_key: String) -> std::result::Result<Self, String> {
        if api_key.trim().is_empty() {
            return Err("API key must not be empty".into());
        }
        Ok(Self { client: reqwest::Client::new(), api_key, base_url: OPENAI_API_BASE.into() })
    }

    fn from_env() -> std::result::Result<Self, String> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| format!("{API_KEY_ENV} environment variable not set"))?;
        Self::new(api_key)
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{route}", self.base_url.trim_end_matches('/'))
    }

    /// POST `body` to `route`, returning the decoded response or a message
    /// describing the failure.
    async fn post<B, R>(&self, route: &str, body: &B) -> std::result::Result<R, String>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(self.url(route))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, route, error = %e, "request failed");
                format!("request failed: {e}")
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = api_error_detail(&body);
            error!(provider = PROVIDER, route, %status, "API error");
            return Err(format!("API returned {status}: {detail}"));
        }

        response.json().await.map_err(|e| {
            error!(provider = PROVIDER, route, error = %e, "failed to parse response");
            format!("failed to parse response: {e}")
        })
    }
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Extract the API's error message from a failure body, falling back to the
/// raw body.
fn api_error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

fn embedding_error(message: String) -> RagError {
    RagError::Embedding { provider: PROVIDER.into(), message }
}

fn completion_error(message: String) -> RagError {
    RagError::Completion { provider: PROVIDER.into(), message }
}

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// # Example
///
/// ```rust,ignore
/// use ragqa::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("sk-...")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
#[derive(Clone)]
pub struct OpenAIEmbeddingProvider {
    api: ApiClient,
    model: String,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider using [`DEFAULT_EMBEDDING_MODEL`].
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api = ApiClient::new(api_key.into()).map_err(embedding_error)?;
        Ok(Self { api, model: DEFAULT_EMBEDDING_MODEL.into() })
    }

    /// Create a provider using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api = ApiClient::from_env().map_err(embedding_error)?;
        Ok(Self { api, model: DEFAULT_EMBEDDING_MODEL.into() })
    }

    /// Create a provider from the credentials in `config`.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.api_key.clone())
    }

    /// Point at an OpenAI-compatible server instead of `api.openai.com`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, model = %self.model, text_len = text.len(), "embedding text");

        let request = EmbeddingRequest { model: &self.model, input: text };
        let response: EmbeddingResponse =
            self.api.post("embeddings", &request).await.map_err(embedding_error)?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| embedding_error("API returned empty response".into()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// A [`CompletionProvider`] backed by the OpenAI chat completions API.
///
/// The model is chosen per request, so one provider serves every
/// [`ChatModel`](crate::ChatModel).
#[derive(Clone)]
pub struct OpenAICompletionProvider {
    api: ApiClient,
}

impl OpenAICompletionProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api = ApiClient::new(api_key.into()).map_err(completion_error)?;
        Ok(Self { api })
    }

    /// Create a provider using the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api = ApiClient::from_env().map_err(completion_error)?;
        Ok(Self { api })
    }

    /// Create a provider from the credentials in `config`.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.api_key.clone())
    }

    /// Point at an OpenAI-compatible server instead of `api.openai.com`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl CompletionProvider for OpenAICompletionProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        debug!(
            provider = PROVIDER,
            model = %request.model,
            message_count = request.messages.len(),
            "requesting chat completion"
        );
        self.api.post("chat/completions", request).await.map_err(completion_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_api_key() {
        assert!(matches!(OpenAIEmbeddingProvider::new(""), Err(RagError::Embedding { .. })));
        assert!(matches!(OpenAICompletionProvider::new(" "), Err(RagError::Completion { .. })));
    }

    #[test]
    fn joins_routes_onto_base_url() {
        let provider = OpenAIEmbeddingProvider::new("sk-test")
            .unwrap()
            .with_base_url("http://localhost:11434/v1/");
        assert_eq!(provider.api.url("embeddings"), "http://localhost:11434/v1/embeddings");
        assert_eq!(provider.model(), DEFAULT_EMBEDDING_MODEL);
    }

    #[test]
    fn extracts_api_error_message() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(api_error_detail(body), "Incorrect API key provided");
        assert_eq!(api_error_detail("upstream timeout"), "upstream timeout");
    }

    #[test]
    fn embedding_request_shape() {
        let request = EmbeddingRequest { model: DEFAULT_EMBEDDING_MODEL, input: "hi" };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"model": "text-embedding-3-small", "input": "hi"})
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_a_provider_error() {
        let provider = OpenAICompletionProvider::new("sk-test")
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        let request = CompletionRequest { model: "gpt-4o-mini".into(), messages: Vec::new() };

        let err = provider.complete(&request).await.unwrap_err();

        assert!(err.is_provider_error());
    }
}
