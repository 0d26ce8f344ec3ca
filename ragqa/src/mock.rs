//! Deterministic in-process providers for tests, demos and offline use.
//!
//! [`MockEmbeddingProvider`] derives embeddings from a hash of the input text
//! unless a fixed vector was registered for it, and can be told to fail or
//! stall on specific inputs. [`MockCompletionProvider`] returns a canned
//! response. Both record every call.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::completion::{CompletionProvider, CompletionRequest, CompletionResponse};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const MOCK_PROVIDER: &str = "Mock";

/// An [`EmbeddingProvider`] that never leaves the process.
#[derive(Debug, Default)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
    fixed: HashMap<String, Vec<f32>>,
    failures: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
    inputs: Mutex<Vec<String>>,
}

impl MockEmbeddingProvider {
    /// Create a provider producing hash-derived vectors of `dimensions` length.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, ..Default::default() }
    }

    /// Always return `embedding` for `text`.
    pub fn with_embedding(mut self, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.fixed.insert(text.into(), embedding);
        self
    }

    /// Fail with [`RagError::Embedding`] whenever `text` is embedded.
    pub fn fail_on(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        let message = format!("refusing to embed '{text}'");
        self.failures.insert(text, message);
        self
    }

    /// Sleep for `delay` before answering for `text`.
    pub fn with_delay(mut self, text: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(text.into(), delay);
        self
    }

    /// Number of `embed` calls made so far, including failed ones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every text passed to `embed`, in call order.
    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().map(|inputs| inputs.clone()).unwrap_or_default()
    }

    fn hashed(&self, text: &str) -> Vec<f32> {
        let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut embedding = vec![0.0f32; self.dimensions];
        for (i, v) in embedding.iter_mut().enumerate() {
            // Top 24 bits of the mixed hash, mapped onto [-1, 1].
            let bits = splitmix64(hash ^ i as u64) >> 40;
            *v = bits as f32 / (1u64 << 24) as f32 * 2.0 - 1.0;
        }
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        embedding
    }
}

/// One round of the SplitMix64 finalizer.
fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut inputs) = self.inputs.lock() {
            inputs.push(text.to_string());
        }

        if let Some(delay) = self.delays.get(text) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(message) = self.failures.get(text) {
            return Err(RagError::Embedding {
                provider: MOCK_PROVIDER.into(),
                message: message.clone(),
            });
        }

        Ok(self.fixed.get(text).cloned().unwrap_or_else(|| self.hashed(text)))
    }

    fn model(&self) -> &str {
        "mock-embedding"
    }
}

/// A [`CompletionProvider`] that returns a canned response.
#[derive(Debug)]
pub struct MockCompletionProvider {
    outcome: std::result::Result<CompletionResponse, String>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletionProvider {
    fn from_outcome(outcome: std::result::Result<CompletionResponse, String>) -> Self {
        Self { outcome, requests: Mutex::new(Vec::new()) }
    }

    /// Respond with a single choice whose content is `answer`.
    pub fn with_answer(answer: impl Into<String>) -> Self {
        Self::from_outcome(Ok(CompletionResponse::with_content(Some(answer.into()))))
    }

    /// Respond with a single choice whose content is `null`.
    pub fn null_content() -> Self {
        Self::from_outcome(Ok(CompletionResponse::with_content(None)))
    }

    /// Respond with no choices at all.
    pub fn no_choices() -> Self {
        Self::from_outcome(Ok(CompletionResponse::default()))
    }

    /// Fail every request with [`RagError::Completion`] carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::from_outcome(Err(message.into()))
    }

    /// Every request received, in call order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|requests| requests.len()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletionProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.outcome.clone().map_err(|message| RagError::Completion {
            provider: MOCK_PROVIDER.into(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;

    #[tokio::test]
    async fn hashed_embeddings_are_deterministic_and_normalized() {
        let provider = MockEmbeddingProvider::new(16);
        let a = provider.embed("hello").await.unwrap();
        let b = provider.embed("hello").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.inputs(), ["hello", "hello"]);
    }

    #[tokio::test]
    async fn distinct_texts_are_not_collinear() {
        let provider = MockEmbeddingProvider::new(64);
        let paris = provider.embed("Paris is the capital of France.").await.unwrap();
        let bananas = provider.embed("Bananas are yellow.").await.unwrap();

        let first = paris[0];
        assert!(paris.iter().any(|x| (x - first).abs() > 1e-3));
        let score = cosine_similarity(&paris, &bananas).unwrap();
        assert!(score.abs() < 0.9, "similarity(paris, bananas) = {score}");

        let alpha = provider.embed("alpha").await.unwrap();
        let distinct: std::collections::HashSet<u32> = alpha.iter().map(|x| x.to_bits()).collect();
        assert!(distinct.len() > 48);
    }

    #[tokio::test]
    async fn completion_mock_records_requests() {
        let provider = MockCompletionProvider::with_answer("ok");
        let request = CompletionRequest { model: "m".into(), messages: Vec::new() };
        let response = provider.complete(&request).await.unwrap();
        assert_eq!(response.first_content(), Some("ok"));
        assert_eq!(provider.requests(), vec![request]);
    }
}
