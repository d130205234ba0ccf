//! AI API client
//!
//! Non-streaming client for OpenAI-compatible chat completion endpoints.

mod config;
mod core;
mod format;

pub use self::config::{AiClientConfig, ENV_API_KEY, ENV_BASE_URL, ENV_MODEL};
pub use self::core::AiClient;
