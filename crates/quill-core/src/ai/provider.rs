//! Model provider abstraction
//!
//! The conversation loop only sees this trait, so tests can drive it with a
//! scripted provider and the CLI with the HTTP client.

use async_trait::async_trait;

use crate::ai::retry::ProviderError;
use crate::ai::types::{ModelRequest, ModelResponse};

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send one request and return at most one response
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, ProviderError>;

    /// Model identifier, for logging
    fn model_id(&self) -> &str;
}
