//! Completion provider trait and its chat-shaped request/response types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The author role, e.g. `"user"`.
    pub role: String,
    /// The message text.
    pub content: String,
}

impl ChatMessage {
    /// A message with the `user` role.
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// A request for a chat completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model identifier, passed through to the provider unvalidated.
    pub model: String,
    /// The conversation to complete.
    pub messages: Vec<ChatMessage>,
}

/// A chat completion response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

/// One generated alternative in a [`CompletionResponse`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
}

/// The message carried by a [`CompletionChoice`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMessage {
    /// Generated text; providers may send `null` or omit it.
    #[serde(default)]
    pub content: Option<String>,
}

impl CompletionResponse {
    /// A response with a single choice carrying `content`.
    pub fn with_content(content: Option<String>) -> Self {
        Self { choices: vec![CompletionChoice { message: CompletionMessage { content } }] }
    }

    /// The first choice's content, if it is present and non-empty.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .filter(|content| !content.is_empty())
    }
}

/// A provider that generates text from a chat conversation.
///
/// Failures (network, auth, unknown model) are returned as
/// [`RagError::Completion`](crate::RagError::Completion) and are never
/// retried.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a completion for the given request.
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}
