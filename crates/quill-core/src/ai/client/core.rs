use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use tracing::debug;

use super::config::AiClientConfig;
use super::format::{build_request_body, parse_error_body, parse_response};
use crate::ai::provider::ModelProvider;
use crate::ai::retry::ProviderError;
use crate::ai::types::{ModelRequest, ModelResponse};
use crate::constants;

/// HTTP client for an OpenAI-compatible chat completions API.
///
/// One `complete` call is exactly one HTTP request; retrying belongs to the
/// conversation loop.
pub struct AiClient {
    http: reqwest::Client,
    config: AiClientConfig,
}

impl AiClient {
    pub fn new(config: AiClientConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(constants::ai::REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &AiClientConfig {
        &self.config
    }

    fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self
            .http
            .post(url)
            .header("content-type", "application/json");
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Turn a non-2xx response into a `ProviderError::Http`
    async fn handle_error_response(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        let (code, message) = parse_error_body(&body);

        Err(ProviderError::Http {
            status: status.as_u16(),
            code,
            message,
            retry_after,
        })
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl ModelProvider for AiClient {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelResponse, ProviderError> {
        let body = build_request_body(&self.config.model, request, self.config.max_tokens);
        debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = self
            .build_request(&self.config.api_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let response = self.handle_error_response(response).await?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        parse_response(&json)
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}
