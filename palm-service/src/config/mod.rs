use crate::services::palm_reader::DEFAULT_MAX_TOKENS;
use crate::services::providers::openai::OPENAI_API_BASE;
use secrecy::{ExposeSecret, SecretString};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

/// Stand-in credential used when no key is configured. The service still
/// starts; every model call then fails with an authentication error.
pub const PLACEHOLDER_API_KEY: &str = "default_key";

const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Debug)]
pub struct PalmConfig {
    pub common: core_config::Config,
    pub openai: OpenAiSettings,
}

#[derive(Debug)]
pub struct OpenAiSettings {
    pub api_key: SecretString,
    /// Multimodal chat model (e.g., gpt-4o)
    pub model: String,
    pub base_url: String,
    /// Cap on generated tokens per analysis
    pub max_tokens: u32,
}

impl OpenAiSettings {
    pub fn has_placeholder_key(&self) -> bool {
        self.api_key.expose_secret() == PLACEHOLDER_API_KEY
    }
}

impl PalmConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let api_key = first_env(&["OPENAI_API_KEY", "OPENAI_API_KEY_ENV_VAR"])
            .unwrap_or_else(|| PLACEHOLDER_API_KEY.to_string());

        Ok(PalmConfig {
            common,
            openai: OpenAiSettings {
                api_key: SecretString::new(api_key),
                model: get_env("OPENAI_MODEL", DEFAULT_MODEL),
                base_url: get_env("OPENAI_BASE_URL", OPENAI_API_BASE),
                max_tokens: parse_or(
                    &get_env("OPENAI_MAX_TOKENS", &DEFAULT_MAX_TOKENS.to_string()),
                    DEFAULT_MAX_TOKENS,
                ),
            },
        })
    }
}

/// First non-empty value among `keys`.
fn first_env(keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| env::var(key).ok())
        .find(|val| !val.trim().is_empty())
}

fn get_env(key: &str, default: &str) -> String {
    first_env(&[key]).unwrap_or_else(|| default.to_string())
}

fn parse_or(raw: &str, fallback: u32) -> u32 {
    match raw.trim().parse() {
        Ok(0) | Err(_) => {
            tracing::warn!(value = %raw, fallback, "Ignoring invalid token limit");
            fallback
        }
        Ok(val) => val,
    }
}
