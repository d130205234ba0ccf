//! AI Client configuration
//!
//! Resolution order, lowest to highest: built-in defaults, `config.toml`,
//! environment variables, then explicit overrides from the caller (CLI flags).

use std::fmt;

use crate::config::QuillConfig;
use crate::constants;

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_MODEL: &str = "OPENAI_MODEL";

/// Configuration for the AI client
#[derive(Clone)]
pub struct AiClientConfig {
    /// Model ID to use for API calls
    pub model: String,
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`)
    pub base_url: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    /// Optional output cap; omitted from the request when unset
    pub max_tokens: Option<usize>,
}

impl Default for AiClientConfig {
    fn default() -> Self {
        Self {
            model: constants::ai::DEFAULT_MODEL.to_string(),
            base_url: constants::ai::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            temperature: constants::ai::DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }
}

// Keeps the API key out of logs
impl fmt::Debug for AiClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiClientConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl AiClientConfig {
    /// Build a config from the file layer plus the process environment
    pub fn resolve(file: &QuillConfig) -> Self {
        Self::resolve_with(file, |key| std::env::var(key).ok())
    }

    /// Same as [`resolve`](Self::resolve) with an injectable env lookup
    pub fn resolve_with(file: &QuillConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(model) = &file.ai.model {
            config.model = model.clone();
        }
        if let Some(base_url) = &file.ai.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(api_key) = &file.ai.api_key {
            config.api_key = Some(api_key.clone());
        }
        if let Some(temperature) = file.ai.temperature {
            config.temperature = temperature;
        }
        config.max_tokens = file.ai.max_tokens;

        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        if let Some(model) = non_empty(ENV_MODEL) {
            config.model = model;
        }
        if let Some(base_url) = non_empty(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        if let Some(api_key) = non_empty(ENV_API_KEY) {
            config.api_key = Some(api_key);
        }

        config
    }

    /// Full chat completions URL
    pub fn api_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
