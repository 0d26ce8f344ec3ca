//! Grounded answer generation from retrieved context.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::completion::{ChatMessage, CompletionProvider, CompletionRequest};
use crate::document::Document;
use crate::error::Result;

/// Answer returned when the provider produces no content.
pub const NO_RESPONSE_SENTINEL: &str = "No response generated";

/// Everything needed to generate one grounded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub query: String,
    /// Context documents, in the order they appear in the prompt.
    pub context: Vec<Document>,
    pub model: String,
}

impl SynthesisRequest {
    pub fn new(query: impl Into<String>, context: Vec<Document>, model: impl Into<String>) -> Self {
        Self { query: query.into(), context, model: model.into() }
    }

    /// Render the grounded prompt.
    ///
    /// ```text
    /// Context:
    /// <doc1>
    /// <doc2>
    ///
    /// Question: <query>
    /// Answer:
    /// ```
    pub fn prompt(&self) -> String {
        build_prompt(&self.query, &self.context)
    }
}

/// Build the grounded prompt for `query` from `context`, one document per line.
pub fn build_prompt(query: &str, context: &[Document]) -> String {
    let context = context.iter().map(Document::text).collect::<Vec<_>>().join("\n");
    format!("Context:\n{context}\n\nQuestion: {query}\nAnswer:")
}

/// Generates answers by prompting a [`CompletionProvider`] with context.
#[derive(Clone)]
pub struct Synthesizer {
    completion_provider: Arc<dyn CompletionProvider>,
}

impl Synthesizer {
    pub fn new(completion_provider: Arc<dyn CompletionProvider>) -> Self {
        Self { completion_provider }
    }

    /// Answer `query` grounded in `context` using `model`.
    ///
    /// Returns [`NO_RESPONSE_SENTINEL`] if the provider returns no content.
    ///
    /// # Errors
    ///
    /// Provider failures are returned unchanged.
    pub async fn synthesize(
        &self,
        query: &str,
        context: &[Document],
        model: &str,
    ) -> Result<String> {
        self.synthesize_request(SynthesisRequest::new(query, context.to_vec(), model)).await
    }

    /// Like [`synthesize`](Self::synthesize), from a prepared request.
    pub async fn synthesize_request(&self, request: SynthesisRequest) -> Result<String> {
        let prompt = request.prompt();
        debug!(
            model = %request.model,
            context_count = request.context.len(),
            prompt_len = prompt.len(),
            "requesting completion"
        );
        let completion_request =
            CompletionRequest { model: request.model, messages: vec![ChatMessage::user(prompt)] };

        let response =
            self.completion_provider.complete(&completion_request).await.inspect_err(|e| {
                error!(model = %completion_request.model, error = %e, "completion failed");
            })?;

        match response.first_content() {
            Some(answer) => {
                info!(
                    model = %completion_request.model,
                    answer_len = answer.len(),
                    "answer generated"
                );
                Ok(answer.to_string())
            }
            None => {
                warn!(model = %completion_request.model, "provider returned no content");
                Ok(NO_RESPONSE_SENTINEL.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;
    use crate::mock::MockCompletionProvider;

    #[test]
    fn prompt_lists_context_then_question() {
        let prompt = build_prompt(
            "What is the capital of France?",
            &["Paris is the capital of France.".into(), "The Eiffel Tower is in Paris.".into()],
        );
        assert_eq!(
            prompt,
            "Context:\nParis is the capital of France.\nThe Eiffel Tower is in Paris.\n\n\
             Question: What is the capital of France?\nAnswer:"
        );
    }

    #[test]
    fn prompt_with_empty_context() {
        assert_eq!(build_prompt("why?", &[]), "Context:\n\n\nQuestion: why?\nAnswer:");
    }

    #[tokio::test]
    async fn sends_single_user_message_with_model() {
        let provider = Arc::new(MockCompletionProvider::with_answer("Paris"));
        let synthesizer = Synthesizer::new(provider.clone());

        let answer = synthesizer
            .synthesize("capital?", &["Paris is the capital of France.".into()], "gpt-4o")
            .await
            .unwrap();

        assert_eq!(answer, "Paris");
        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gpt-4o");
        assert_eq!(
            requests[0].messages,
            vec![ChatMessage::user(
                "Context:\nParis is the capital of France.\n\nQuestion: capital?\nAnswer:"
            )]
        );
    }

    #[tokio::test]
    async fn null_content_yields_sentinel() {
        let synthesizer = Synthesizer::new(Arc::new(MockCompletionProvider::null_content()));
        let answer = synthesizer.synthesize("q", &[], "gpt-4o-mini").await.unwrap();
        assert_eq!(answer, NO_RESPONSE_SENTINEL);
    }

    #[tokio::test]
    async fn no_choices_yields_sentinel() {
        let synthesizer = Synthesizer::new(Arc::new(MockCompletionProvider::no_choices()));
        let answer = synthesizer.synthesize("q", &[], "gpt-4o-mini").await.unwrap();
        assert_eq!(answer, NO_RESPONSE_SENTINEL);
    }

    #[tokio::test]
    async fn empty_content_yields_sentinel() {
        let synthesizer = Synthesizer::new(Arc::new(MockCompletionProvider::with_answer("")));
        let answer = synthesizer.synthesize("q", &[], "gpt-4o-mini").await.unwrap();
        assert_eq!(answer, NO_RESPONSE_SENTINEL);
    }

    #[tokio::test]
    async fn provider_failure_propagates_unchanged() {
        let synthesizer =
            Synthesizer::new(Arc::new(MockCompletionProvider::failing("model not found")));

        let err = synthesizer.synthesize("q", &[], "no-such-model").await.unwrap_err();

        match err {
            RagError::Completion { message, .. } => assert_eq!(message, "model not found"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
