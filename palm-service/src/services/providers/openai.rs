//! OpenAI chat completions provider.
//!
//! Sends one `/chat/completions` request per call with the image inlined as
//! an `image_url` content part. No client timeout and no retries: a call runs
//! until the provider answers or the connection fails.

use super::{FinishReason, ProviderError, ProviderResponse, VisionProvider, VisionRequest};
use async_trait::async_trait;
use reqwest::{header, Client};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Default OpenAI API base URL.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI provider configuration.
#[derive(Debug)]
pub struct OpenAiConfig {
    pub api_key: SecretString,
    pub model: String,
    /// API base URL without trailing slash.
    pub base_url: String,
}

pub struct OpenAiVisionProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiVisionProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().build().map_err(|e| {
            ProviderError::NotConfigured(format!("failed to create HTTP client: {}", e))
        })?;

        Ok(Self { config, client })
    }

    fn chat_completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_request(&self, request: &VisionRequest) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(request.system_prompt.clone()),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text {
                            text: request.user_text.clone(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: request.image_url.clone(),
                            },
                        },
                    ]),
                },
            ],
            max_tokens: request.max_tokens,
            response_format: request.json_output.then(|| ResponseFormat {
                format_type: "json_object",
            }),
        }
    }
}

#[async_trait]
impl VisionProvider for OpenAiVisionProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: &VisionRequest) -> Result<ProviderResponse, ProviderError> {
        let body = self.build_request(request);

        tracing::debug!(
            model = %self.config.model,
            image_len = request.image_url.len(),
            max_tokens = request.max_tokens,
            "Sending request to OpenAI chat completions"
        );

        let response = self
            .client
            .post(self.chat_completions_url())
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }

            return Err(ProviderError::ApiError(format!(
                "OpenAI API error {}: {}",
                status, error_text
            )));
        }

        let api_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        let choice = api_response.choices.into_iter().next();

        let finish_reason = match choice.as_ref().and_then(|c| c.finish_reason.as_deref()) {
            Some("stop") | None => FinishReason::Complete,
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            Some(_) => FinishReason::Other,
        };

        if finish_reason == FinishReason::ContentFilter {
            return Err(ProviderError::ContentFiltered);
        }

        let usage = api_response.usage.unwrap_or_default();

        Ok(ProviderResponse {
            text: choice.and_then(|c| c.message.content),
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            finish_reason,
        })
    }
}

// ============================================================================
// OpenAI API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}
