//! LLM provider integrations
//!
//! Every upstream we talk to speaks the OpenAI chat completions format,
//! so there is a single adapter ([`openai_compat::OpenAICompatProvider`])
//! instantiated with different presets. Providers are stacked into a
//! [`ProviderChain`] that tries each one in order until a completion
//! succeeds.

pub mod openai_compat;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::conversation::{Message, Role};

pub use openai_compat::{OpenAICompatConfig, OpenAICompatProvider};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("All completion providers failed")]
    Exhausted,
}

/// Wire-format chat message for completion requests.
///
/// Distinct from [`crate::conversation::Message`]: this one carries the
/// `system` role and none of the conversation metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

impl From<&Message> for ChatMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: match msg.role {
                Role::User => "user".to_string(),
                Role::Assistant => "assistant".to_string(),
            },
            content: msg.content.clone(),
        }
    }
}

/// Sampling knobs passed through to the completion API.
#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionParams {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

/// Anything that can turn a message list into completion text.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<String, ProviderError>;
}

/// Ordered list of providers tried until one returns a completion.
///
/// A failure of any kind (network, HTTP error, unparseable body) moves
/// on to the next provider; the error only surfaces once every provider
/// has been tried.
pub struct ProviderChain {
    providers: Vec<Box<dyn Completion>>,
}

impl ProviderChain {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn push(&mut self, provider: impl Completion + 'static) {
        self.providers.push(Box::new(provider));
    }

    pub fn with(mut self, provider: impl Completion + 'static) -> Self {
        self.push(provider);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<String, ProviderError> {
        if self.providers.is_empty() {
            return Err(ProviderError::NotConfigured(
                "no completion providers".to_string(),
            ));
        }

        for provider in &self.providers {
            match provider.complete(messages, params).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    warn!(
                        provider = provider.name(),
                        error = %err,
                        "completion failed, trying next provider"
                    );
                }
            }
        }

        Err(ProviderError::Exhausted)
    }
}

impl Default for ProviderChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider {
        name: &'static str,
        result: Result<&'static str, &'static str>,
    }

    #[async_trait]
    impl Completion for FixedProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _params: CompletionParams,
        ) -> Result<String, ProviderError> {
            match self.result {
                Ok(text) => Ok(text.to_string()),
                Err(msg) => Err(ProviderError::InvalidResponse(msg.to_string())),
            }
        }
    }

    fn params() -> CompletionParams {
        CompletionParams::new(0.7, 100)
    }

    #[tokio::test]
    async fn chain_returns_first_success() {
        let chain = ProviderChain::new()
            .with(FixedProvider {
                name: "primary",
                result: Ok("from primary"),
            })
            .with(FixedProvider {
                name: "fallback",
                result: Ok("from fallback"),
            });

        let text = chain
            .complete(&[ChatMessage::user("hi")], params())
            .await
            .unwrap();
        assert_eq!(text, "from primary");
    }

    #[tokio::test]
    async fn chain_falls_through_to_next_provider() {
        let chain = ProviderChain::new()
            .with(FixedProvider {
                name: "primary",
                result: Err("boom"),
            })
            .with(FixedProvider {
                name: "fallback",
                result: Ok("from fallback"),
            });

        let text = chain
            .complete(&[ChatMessage::user("hi")], params())
            .await
            .unwrap();
        assert_eq!(text, "from fallback");
    }

    #[tokio::test]
    async fn chain_reports_exhaustion_when_all_fail() {
        let chain = ProviderChain::new().with(FixedProvider {
            name: "primary",
            result: Err("boom"),
        });

        let err = chain
            .complete(&[ChatMessage::user("hi")], params())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Exhausted));
    }

    #[tokio::test]
    async fn empty_chain_is_not_configured() {
        let chain = ProviderChain::new();
        let err = chain
            .complete(&[ChatMessage::user("hi")], params())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn message_conversion_maps_roles() {
        let msg = Message::user("Hello");
        let chat_msg = ChatMessage::from(&msg);
        assert_eq!(chat_msg.role, "user");
        assert_eq!(chat_msg.content, "Hello");

        let msg = Message::assistant("Hi there");
        let chat_msg = ChatMessage::from(&msg);
        assert_eq!(chat_msg.role, "assistant");
    }
}
