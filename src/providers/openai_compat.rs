//! OpenAI-compatible provider
//!
//! Works with any API that implements the OpenAI chat completions format.
//! We use it against:
//! - Groq (api.groq.com) for primary text completions
//! - SiliconFlow (api.siliconflow.com) as the fallback text provider
//! - SiliconFlow's Qwen VL deployment for image OCR

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{ChatMessage, Completion, CompletionParams, ProviderError};

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Error response from API
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone)]
pub struct OpenAICompatConfig {
    /// Base URL for the API (e.g., https://api.groq.com/openai/v1)
    pub base_url: String,
    /// API key (optional for local servers)
    pub api_key: Option<String>,
    /// Model to request completions from
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OpenAICompatConfig {
    /// Create config for Groq
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key: Some(api_key.into()),
            model: "llama-3.3-70b-versatile".to_string(),
            timeout_secs: 60,
        }
    }

    /// Create config for SiliconFlow's DeepSeek deployment
    pub fn siliconflow(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.siliconflow.com/v1".to_string(),
            api_key: Some(api_key.into()),
            model: "deepseek-ai/DeepSeek-V3".to_string(),
            timeout_secs: 60,
        }
    }

    /// Create config for SiliconFlow's Qwen vision-language deployment
    pub fn siliconflow_vision(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.siliconflow.com/v1".to_string(),
            api_key: Some(api_key.into()),
            model: "Qwen/Qwen2.5-VL-72B-Instruct".to_string(),
            timeout_secs: 60,
        }
    }
}

/// OpenAI-compatible API provider
pub struct OpenAICompatProvider {
    name: String,
    config: OpenAICompatConfig,
    client: Client,
}

impl OpenAICompatProvider {
    /// Create a new provider with the given configuration
    pub fn new(name: impl Into<String>, config: OpenAICompatConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            name: name.into(),
            config,
            client,
        }
    }

    /// Create provider for Groq
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self::new("groq", OpenAICompatConfig::groq(api_key))
    }

    /// Create provider for SiliconFlow
    pub fn siliconflow(api_key: impl Into<String>) -> Self {
        Self::new("siliconflow", OpenAICompatConfig::siliconflow(api_key))
    }

    /// Create provider for SiliconFlow's vision model
    pub fn siliconflow_vision(api_key: impl Into<String>) -> Self {
        Self::new(
            "siliconflow-vision",
            OpenAICompatConfig::siliconflow_vision(api_key),
        )
    }

    /// Send a completion request with an inline image attachment.
    ///
    /// The image travels as a data URL in a multimodal `image_url` content
    /// part, followed by the text instruction. Only vision models accept
    /// this shape.
    pub async fn complete_with_image(
        &self,
        image_data_url: &str,
        instruction: &str,
        params: CompletionParams,
    ) -> Result<String, ProviderError> {
        let request = json!({
            "model": self.config.model,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image_url",
                        "image_url": { "url": image_data_url },
                    },
                    {
                        "type": "text",
                        "text": instruction,
                    },
                ],
            }],
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        });

        self.send_chat_request(&request).await
    }

    /// POST a chat completions body and extract the first choice's text.
    async fn send_chat_request<B: Serialize + ?Sized>(
        &self,
        request: &B,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let mut req_builder = self.client.post(&url);

        // Add authorization if API key is provided
        if let Some(ref api_key) = self.config.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Try to parse error response
            if let Ok(error_resp) = serde_json::from_str::<ErrorResponse>(&body) {
                return Err(ProviderError::Api {
                    status: status.as_u16(),
                    message: error_resp.error.message,
                });
            }
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("No completion content in response".to_string())
            })
    }
}

#[async_trait]
impl Completion for OpenAICompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: CompletionParams,
    ) -> Result<String, ProviderError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        self.send_chat_request(&request).await
    }
}
