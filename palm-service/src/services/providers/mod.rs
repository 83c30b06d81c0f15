//! Multimodal model provider abstraction.
//!
//! `PalmReader` talks to the model only through `VisionProvider`, so the
//! OpenAI backend can be swapped for the mock in tests.

pub mod mock;
pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::ApiError(_) => "api_error",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::ContentFiltered => "content_filtered",
            ProviderError::NetworkError(_) => "network_error",
        }
    }
}

/// A single-turn vision completion: one system instruction, one user turn
/// made of text plus an inline image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionRequest {
    pub system_prompt: String,
    pub user_text: String,
    /// Image as a `data:` URL.
    pub image_url: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Ask the provider to return a single JSON object.
    pub json_output: bool,
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    ContentFilter,
    Other,
}

/// Result of a provider call.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Completion text; `None` when the provider returned no content.
    pub text: Option<String>,

    pub input_tokens: u32,

    pub output_tokens: u32,

    pub finish_reason: FinishReason,
}

#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Provider name used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Run one completion. Implementations make exactly one attempt.
    async fn complete(&self, request: &VisionRequest) -> Result<ProviderResponse, ProviderError>;
}
