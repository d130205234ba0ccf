//! Parallel sub-agent fan-out and synthesis
//!
//! N participants run the same task independently on the tokio runtime. They
//! share nothing but the session state carried by the `ToolContext` (read
//! ledger, todo list). A failed or panicked participant is reported as a
//! degraded result so the rest of the fan-out still counts. A final tool-free
//! turn merges all outputs into one answer.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::ai::provider::ModelProvider;
use crate::ai::retry::RetryConfig;
use crate::ai::types::{AiTool, Message};
use crate::constants::agent::{PARTICIPANT_SUFFIX, SYNTHESIS_INDEX};
use crate::constants::ai::DEFAULT_TEMPERATURE;
use crate::tools::registry::{ToolContext, ToolRegistry};

use super::conversation::ConversationLoop;
use super::definitions::AgentConfig;
use super::prompts::{base_system_prompt, combined_system_prompt, synthesis_prompt};
use super::AgentError;

/// Output of one participant, or of the synthesis pass (`agent_index == -1`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentResult {
    pub agent_index: i32,
    pub content: String,
    pub tool_use_count: usize,
    pub token_count: usize,
    pub duration: Duration,
}

impl AgentResult {
    fn degraded(agent_index: i32, reason: impl std::fmt::Display) -> Self {
        Self {
            agent_index,
            content: format!("Agent execution failed: {}", reason),
            tool_use_count: 0,
            token_count: 0,
            duration: Duration::ZERO,
        }
    }

    pub fn is_synthesis(&self) -> bool {
        self.agent_index == SYNTHESIS_INDEX
    }
}

/// Participants plus their synthesis, with totals
#[derive(Debug, Clone)]
pub struct FanOutOutcome {
    /// Sorted by agent index
    pub results: Vec<AgentResult>,
    pub synthesis: AgentResult,
    /// Sum over participants
    pub total_tool_uses: usize,
    /// Sum over participants and synthesis
    pub total_tokens: usize,
}

/// Spawns sub-agent conversations against a shared provider and registry
#[derive(Clone)]
pub struct ParallelAgentExecutor {
    provider: Arc<dyn ModelProvider>,
    registry: Arc<ToolRegistry>,
    ctx: ToolContext,
    base_prompt: Arc<str>,
    retry: RetryConfig,
    temperature: f32,
}

impl ParallelAgentExecutor {
    pub fn new(provider: Arc<dyn ModelProvider>, registry: Arc<ToolRegistry>, ctx: ToolContext) -> Self {
        let base_prompt = base_system_prompt(&ctx.working_dir).into();
        Self {
            provider,
            registry,
            ctx,
            base_prompt,
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

    fn conversation(&self) -> ConversationLoop {
        ConversationLoop::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.registry),
            self.ctx.clone(),
        )
        .with_retry_config(self.retry)
        .with_temperature(self.temperature)
    }

    fn system_prompt(&self, config: &AgentConfig) -> String {
        combined_system_prompt(&self.base_prompt, &config.system_prompt)
    }

    /// Run one participant to completion
    pub async fn execute_agent_task(
        &self,
        task: &str,
        agent_index: i32,
        config: &AgentConfig,
        tools: &[AiTool],
        max_iterations: usize,
    ) -> Result<AgentResult, AgentError> {
        let start = Instant::now();
        let system_prompt = self.system_prompt(config);

        let outcome = self
            .conversation()
            .run(vec![Message::user(task)], Some(&system_prompt), tools, max_iterations)
            .await?;

        debug!(
            agent_index,
            tool_uses = outcome.tool_use_count,
            tokens = outcome.total_tokens,
            hit_limit = outcome.hit_iteration_limit(),
            "Agent finished"
        );

        Ok(AgentResult {
            agent_index,
            content: outcome.content,
            tool_use_count: outcome.tool_use_count,
            token_count: outcome.total_tokens,
            duration: start.elapsed(),
        })
    }

    /// Run `n` participants concurrently. Always returns `n` results sorted by
    /// index; failures are degraded results.
    pub async fn execute_parallel(
        &self,
        task: &str,
        config: &AgentConfig,
        n: usize,
        tools: &[AiTool],
        max_iterations: usize,
    ) -> Vec<AgentResult> {
        info!(agents = n, agent_type = %config.agent_type, "Starting parallel agents");

        let prompt: Arc<str> = format!("{}{}", task, PARTICIPANT_SUFFIX).into();
        let config = Arc::new(config.clone());
        let tools: Arc<[AiTool]> = tools.into();

        let mut set = JoinSet::new();
        for i in 0..n {
            let index = i as i32;
            let this = self.clone();
            let prompt = Arc::clone(&prompt);
            let config = Arc::clone(&config);
            let tools = Arc::clone(&tools);

            set.spawn(async move {
                let run = this.execute_agent_task(&prompt, index, &config, &tools, max_iterations);
                let result = match AssertUnwindSafe(run).catch_unwind().await {
                    Ok(result) => result,
                    Err(payload) => Err(AgentError::Panicked(panic_message(payload.as_ref()))),
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<AgentResult>> = vec![None; n];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, Ok(result))) => slots[index as usize] = Some(result),
                Ok((index, Err(e))) => {
                    warn!(agent_index = index, error = %e, "Agent failed");
                    slots[index as usize] = Some(AgentResult::degraded(index, e));
                }
                // Panics are caught inside the task, so only cancellation lands here
                Err(e) => warn!(error = %e, "Agent task did not complete"),
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| slot.unwrap_or_else(|| AgentResult::degraded(i as i32, AgentError::Cancelled)))
            .collect()
    }

    /// One tool-free turn merging participant outputs
    pub async fn synthesize(
        &self,
        task: &str,
        results: &[AgentResult],
        config: &AgentConfig,
    ) -> Result<AgentResult, AgentError> {
        let start = Instant::now();
        let mut sorted = results.to_vec();
        sorted.sort_by_key(|r| r.agent_index);

        let prompt = synthesis_prompt(task, &sorted);
        let system_prompt = self.system_prompt(config);
        let outcome = self
            .conversation()
            .run(vec![Message::user(prompt)], Some(&system_prompt), &[], 1)
            .await?;

        Ok(AgentResult {
            agent_index: SYNTHESIS_INDEX,
            content: outcome.content,
            tool_use_count: 0,
            token_count: outcome.total_tokens,
            duration: start.elapsed(),
        })
    }

    /// Fan out to `n` participants and synthesize their outputs
    pub async fn fan_out(
        &self,
        task: &str,
        config: &AgentConfig,
        n: usize,
        tools: &[AiTool],
        max_iterations: usize,
    ) -> Result<FanOutOutcome, AgentError> {
        let results = self
            .execute_parallel(task, config, n, tools, max_iterations)
            .await;
        let synthesis = self.synthesize(task, &results, config).await?;

        let total_tool_uses = results.iter().map(|r| r.tool_use_count).sum();
        let total_tokens =
            results.iter().map(|r| r.token_count).sum::<usize>() + synthesis.token_count;

        info!(
            agents = n,
            total_tool_uses,
            total_tokens,
            "Parallel agents synthesized"
        );

        Ok(FanOutOutcome {
            results,
            synthesis,
            total_tool_uses,
            total_tokens,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::definitions::built_in_agents;
    use crate::agent::testing::{tool_call, ScriptedProvider};
    use crate::ai::retry::ProviderError;
    use crate::ai::types::{ModelRequest, ModelResponse};
    use serde_json::json;

    fn user_text(request: &ModelRequest) -> String {
        request
            .messages
            .first()
            .and_then(|m| m.content.clone())
            .unwrap_or_default()
    }

    fn executor(provider: Arc<ScriptedProvider>) -> ParallelAgentExecutor {
        ParallelAgentExecutor::new(provider, Arc::new(ToolRegistry::new()), ToolContext::default())
            .with_retry_config(RetryConfig {
                max_attempts: 1,
                base_delay: Duration::from_millis(1),
            })
    }

    #[tokio::test]
    async fn test_fan_out_with_one_failing_participant() {
        // Participant prompts are identical, so fail whichever call comes second
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let provider = Arc::new(ScriptedProvider::from_fn(move |request| {
            if user_text(request).starts_with("Original task:") {
                return Ok(ModelResponse::text("merged", 5));
            }
            let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n == 1 {
                Err(ProviderError::Http {
                    status: 500,
                    code: None,
                    message: "boom".into(),
                    retry_after: None,
                })
            } else {
                Ok(ModelResponse::text("finding", 10))
            }
        }));
        let exec = executor(provider.clone());
        let config = built_in_agents().remove(0);

        let outcome = exec.fan_out("audit", &config, 3, &[], 5).await.unwrap();

        assert_eq!(outcome.results.len(), 3);
        let indices: Vec<i32> = outcome.results.iter().map(|r| r.agent_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);

        let failed: Vec<&AgentResult> = outcome
            .results
            .iter()
            .filter(|r| r.content.starts_with("Agent execution failed:"))
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].token_count, 0);
        assert!(failed[0].content.contains("boom"));

        assert!(outcome.synthesis.is_synthesis());
        assert_eq!(outcome.synthesis.content, "merged");
        assert_eq!(outcome.total_tokens, 10 + 10 + 5);
    }

    #[tokio::test]
    async fn test_panicking_participant_is_degraded() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let provider = Arc::new(ScriptedProvider::from_fn(move |request| {
            if user_text(request).starts_with("Original task:") {
                return Ok(ModelResponse::text("merged", 5));
            }
            if counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                panic!("model client crashed");
            }
            Ok(ModelResponse::text("finding", 10))
        }));
        let exec = executor(provider.clone());
        let config = built_in_agents().remove(0);

        let outcome = exec.fan_out("audit", &config, 3, &[], 5).await.unwrap();

        assert_eq!(outcome.results.len(), 3);
        let panicked: Vec<&AgentResult> = outcome
            .results
            .iter()
            .filter(|r| {
                r.content
                    .starts_with("Agent execution failed: Agent task panicked:")
            })
            .collect();
        assert_eq!(panicked.len(), 1);
        assert!(panicked[0].content.contains("model client crashed"));
        assert_eq!(panicked[0].tool_use_count, 0);
        assert_eq!(panicked[0].token_count, 0);

        // Synthesis still ran over all three slots
        assert_eq!(outcome.synthesis.content, "merged");
        assert_eq!(outcome.total_tokens, 10 + 10 + 5);
        assert_eq!(provider.call_count(), 4);
    }

    #[tokio::test]
    async fn test_participant_prompt_and_system_prompt() {
        let provider = Arc::new(ScriptedProvider::from_fn(|_| Ok(ModelResponse::text("ok", 1))));
        let exec = executor(provider.clone());
        let config = built_in_agents().remove(0);

        exec.execute_parallel("find bugs", &config, 2, &[], 3).await;

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        for request in &requests {
            assert_eq!(
                user_text(request),
                "find bugs\n\nProvide a thorough and complete analysis."
            );
            let system = request.system_prompt.as_deref().unwrap();
            assert!(system.ends_with(&config.system_prompt));
        }
    }

    #[tokio::test]
    async fn test_synthesis_has_no_tools_and_single_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(ModelResponse::tool_calls(
            vec![tool_call("c", "read", json!({}))],
            2,
        ))]));
        let exec = executor(provider.clone());
        let config = built_in_agents().remove(0);
        let results = vec![AgentResult {
            agent_index: 0,
            content: "a".into(),
            tool_use_count: 0,
            token_count: 0,
            duration: Duration::ZERO,
        }];

        let synthesis = exec.synthesize("t", &results, &config).await.unwrap();

        assert_eq!(synthesis.agent_index, -1);
        assert_eq!(provider.call_count(), 1);
        assert!(provider.requests()[0].tools.is_empty());
    }

    #[test]
    fn test_panic_message_downcasts() {
        let payload: Box<dyn Any + Send> = Box::new("bad state");
        assert_eq!(panic_message(payload.as_ref()), "bad state");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
    }
}
