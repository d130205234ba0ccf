//! Bounded tool-calling conversation loop
//!
//! One `run` drives a transcript to completion: every iteration sends the full
//! transcript to the model, dispatches any requested tool calls in order, and
//! appends their results. A reply without tool calls ends the loop. Running
//! out of iterations is a reportable outcome, not an error.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::ai::provider::ModelProvider;
use crate::ai::retry::{with_retry, RetryConfig};
use crate::ai::types::{AiTool, Message, ModelRequest};
use crate::constants::agent::ITERATION_LIMIT_MESSAGE;
use crate::constants::ai::DEFAULT_TEMPERATURE;
use crate::tools::registry::{ToolContext, ToolRegistry};

use super::executor::execute_tools;
use super::AgentError;

/// How a loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopFinish {
    /// The model replied without requesting tools
    Done,
    /// The iteration bound was hit while the model kept calling tools
    MaxIterationsReached,
}

/// Result of one conversation run
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub content: String,
    pub finish: LoopFinish,
    /// Tool calls the model requested across all iterations
    pub tool_use_count: usize,
    pub total_tokens: usize,
    /// Caller messages plus every assistant and tool message produced
    pub transcript: Vec<Message>,
}

impl LoopOutcome {
    pub fn hit_iteration_limit(&self) -> bool {
        self.finish == LoopFinish::MaxIterationsReached
    }
}

/// Drives model turns and tool dispatch for one agent
pub struct ConversationLoop {
    provider: Arc<dyn ModelProvider>,
    registry: Arc<ToolRegistry>,
    ctx: ToolContext,
    retry: RetryConfig,
    temperature: f32,
}

impl ConversationLoop {
    pub fn new(provider: Arc<dyn ModelProvider>, registry: Arc<ToolRegistry>, ctx: ToolContext) -> Self {
        Self {
            provider,
            registry,
            ctx,
            retry: RetryConfig::default(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Run until the model stops calling tools or `max_iterations` model turns
    /// have been spent. `tools` is both the schema list sent to the model and
    /// the set of names allowed to dispatch; an empty slice means a tool-free
    /// turn.
    pub async fn run(
        &self,
        messages: Vec<Message>,
        system_prompt: Option<&str>,
        tools: &[AiTool],
        max_iterations: usize,
    ) -> Result<LoopOutcome, AgentError> {
        let offered: HashSet<String> = tools.iter().map(|t| t.name.clone()).collect();
        let mut transcript = messages;
        let mut total_tokens = 0usize;
        let mut tool_use_count = 0usize;

        for iteration in 0..max_iterations {
            let request = ModelRequest {
                system_prompt: system_prompt.map(str::to_string),
                messages: transcript.clone(),
                tools: tools.to_vec(),
                temperature: self.temperature,
            };

            debug!(
                iteration,
                messages = request.messages.len(),
                tools = request.tools.len(),
                "Sending model request"
            );
            let response = with_retry(&self.retry, || self.provider.complete(&request)).await?;
            total_tokens += response.usage.total_tokens;

            if !response.has_tool_calls() {
                let content = response.content.unwrap_or_default();
                transcript.push(Message::assistant(content.clone()));
                debug!(iteration, total_tokens, tool_use_count, "Conversation finished");
                return Ok(LoopOutcome {
                    content,
                    finish: LoopFinish::Done,
                    tool_use_count,
                    total_tokens,
                    transcript,
                });
            }

            tool_use_count += response.tool_calls.len();
            transcript.push(Message::assistant_with_tools(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            // Nothing can be dispatched without a tool set
            if tools.is_empty() {
                debug!(iteration, "Tool calls requested on a tool-free turn, stopping");
                return Ok(LoopOutcome {
                    content: response.content.unwrap_or_default(),
                    finish: LoopFinish::Done,
                    tool_use_count,
                    total_tokens,
                    transcript,
                });
            }

            let names: Vec<&str> = response.tool_calls.iter().map(|c| c.name.as_str()).collect();
            debug!(iteration, tools = ?names, "Dispatching tool calls");
            let results =
                execute_tools(&response.tool_calls, &self.registry, &self.ctx, &offered).await;
            transcript.extend(results);
        }

        info!(max_iterations, tool_use_count, "Iteration limit reached");
        Ok(LoopOutcome {
            content: ITERATION_LIMIT_MESSAGE.to_string(),
            finish: LoopFinish::MaxIterationsReached,
            tool_use_count,
            total_tokens,
            transcript,
        })
    }
}
