//! Agent tool - Delegate a task to one or more sub-agents
//!
//! With a parallel count of 1 the task runs as a single sub-agent. With more,
//! the same task fans out to N participants and their outputs are merged by a
//! tool-free synthesis turn. Sub-agents get the tools their persona allows,
//! never this tool itself.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::agent::definitions::{filter_tools, find_agent, load_all_agents};
use crate::agent::parallel::ParallelAgentExecutor;
use crate::ai::provider::ModelProvider;
use crate::constants::agent::{
    AGENT_TOOL_TIMEOUT_SECS, DEFAULT_AGENT_TYPE, DEFAULT_PARALLEL_AGENTS, MAX_PARALLEL_AGENTS,
    SUBAGENT_MAX_ITERATIONS,
};
use crate::constants::ai::DEFAULT_TEMPERATURE;
use crate::tools::registry::{Tool, ToolRegistry};
use crate::tools::{parse_params, ToolContext, ToolResult};

/// Fan-out settings for the agent tool
#[derive(Debug, Clone)]
pub struct AgentToolConfig {
    pub parallel_agents: usize,
    pub max_iterations: usize,
    pub temperature: f32,
    /// Project root used to look up `.quill/agents`
    pub project_dir: PathBuf,
}

impl AgentToolConfig {
    pub fn new(project_dir: PathBuf) -> Self {
        Self {
            parallel_agents: DEFAULT_PARALLEL_AGENTS,
            max_iterations: SUBAGENT_MAX_ITERATIONS,
            temperature: DEFAULT_TEMPERATURE,
            project_dir,
        }
    }

    pub fn with_parallel_agents(mut self, n: usize) -> Self {
        self.parallel_agents = n.clamp(1, MAX_PARALLEL_AGENTS);
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

pub struct AgentTool {
    provider: Arc<dyn ModelProvider>,
    /// Tools offered to sub-agents
    subagent_tools: Arc<ToolRegistry>,
    config: AgentToolConfig,
    description: String,
}

#[derive(Deserialize)]
struct Params {
    prompt: String,
    #[serde(default)]
    subagent_type: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl AgentTool {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        subagent_tools: Arc<ToolRegistry>,
        config: AgentToolConfig,
    ) -> Self {
        let description = describe_agents(&config);
        Self {
            provider,
            subagent_tools,
            config,
            description,
        }
    }
}

fn describe_agents(config: &AgentToolConfig) -> String {
    let listing: Vec<String> = load_all_agents(&config.project_dir)
        .iter()
        .map(|a| {
            format!(
                "- {}: {} (Tools: {})",
                a.agent_type,
                a.when_to_use,
                a.allowed_tools.describe()
            )
        })
        .collect();

    format!(
        "Launch sub-agents to handle complex, multi-step tasks autonomously.\n\n\
         Available agent types:\n{}\n\n\
         When to use:\n\
         - Complex multi-step tasks requiring research\n\
         - Tasks that benefit from multiple perspectives\n\
         - Code analysis across multiple files\n\n\
         When NOT to use:\n\
         - Simple single-file operations\n\
         - Direct file reads (use read instead)\n\
         - Quick searches (use grep instead)",
        listing.join("\n")
    )
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        "agent"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "Detailed task description for the agent to perform autonomously"
                },
                "subagent_type": {
                    "type": "string",
                    "description": "Type of agent to use (default: general-purpose)",
                    "default": DEFAULT_AGENT_TYPE
                },
                "description": {
                    "type": "string",
                    "description": "Optional brief description of the task"
                }
            },
            "required": ["prompt"],
            "additionalProperties": false
        })
    }

    fn timeout_override(&self, _params: &Value) -> Option<Duration> {
        Some(Duration::from_secs(AGENT_TOOL_TIMEOUT_SECS))
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> ToolResult {
        let params = match parse_params::<Params>(params) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let agent_type = params
            .subagent_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AGENT_TYPE.to_string());

        // Definitions are read from disk on every lookup
        let project_dir = self.config.project_dir.clone();
        let lookup = agent_type.clone();
        let found = tokio::task::spawn_blocking(move || find_agent(&lookup, &project_dir)).await;
        let agent = match found {
            Ok(Some(agent)) => agent,
            Ok(None) => {
                return ToolResult::error_with_code(
                    "not_found",
                    format!("Agent type '{}' not found", agent_type),
                )
            }
            Err(e) => return ToolResult::error(format!("Agent lookup failed: {}", e)),
        };

        let tools = filter_tools(&agent, &self.subagent_tools.get_ai_tools().await);
        let n = self.config.parallel_agents;
        info!(
            agent_type = %agent.agent_type,
            parallel_agents = n,
            tools = tools.len(),
            description = params.description.as_deref().unwrap_or(""),
            "Launching sub-agents"
        );

        // Sub-agent tool calls use the registry default timeout
        let sub_ctx = ToolContext {
            timeout: None,
            ..ctx.clone()
        };
        let executor = ParallelAgentExecutor::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.subagent_tools),
            sub_ctx,
        )
        .with_temperature(self.config.temperature);

        if n > 1 {
            match executor
                .fan_out(&params.prompt, &agent, n, &tools, self.config.max_iterations)
                .await
            {
                Ok(outcome) => ToolResult::success_data(json!({
                    "content": outcome.synthesis.content,
                    "tool_use_count": outcome.total_tool_uses,
                    "tokens": outcome.total_tokens,
                    "parallel_agents": n,
                    "synthesis": true
                })),
                Err(e) => ToolResult::error_with_code("agent_failed", e),
            }
        } else {
            match executor
                .execute_agent_task(&params.prompt, 0, &agent, &tools, self.config.max_iterations)
                .await
            {
                Ok(result) => ToolResult::success_data(json!({
                    "content": result.content,
                    "tool_use_count": result.tool_use_count,
                    "tokens": result.token_count,
                    "parallel_agents": 1,
                    "synthesis": false
                })),
                Err(e) => ToolResult::error_with_code("agent_failed", e),
            }
        }
    }
}
