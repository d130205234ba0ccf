//! Interactive and single-query front end

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use quill_core::agent::hooks::{HookResult, PreToolHook};
use quill_core::agent::prompts::base_system_prompt;
use quill_core::agent::{ConversationLoop, LoggingHook, LoopOutcome, SafetyHook};
use quill_core::ai::types::{AiTool, Message};
use quill_core::ai::{AiClient, ModelProvider};
use quill_core::tools::implementations::AgentToolConfig;
use quill_core::tools::{register_agent_tool, register_all_tools, ToolContext, ToolRegistry};
use quill_core::Session;

use crate::settings::Settings;

const EXIT_WORDS: [&str; 3] = ["exit", "quit", "q"];

/// Prints a one-line notice for every tool call so the user can follow along
struct ToolAnnouncer;

#[async_trait]
impl PreToolHook for ToolAnnouncer {
    async fn before_execute(&self, name: &str, params: &Value, _ctx: &ToolContext) -> HookResult {
        let field = |key: &str| params.get(key).and_then(Value::as_str).unwrap_or("");
        let detail = match name {
            "bash" => field("command").to_string(),
            "read" | "write" | "edit" => field("file_path").to_string(),
            "glob" | "grep" => field("pattern").to_string(),
            "todo_write" => format!(
                "managing {} tasks",
                params.get("todos").and_then(Value::as_array).map_or(0, Vec::len)
            ),
            "agent" => params
                .get("subagent_type")
                .and_then(Value::as_str)
                .unwrap_or("general-purpose")
                .to_string(),
            _ => String::new(),
        };
        eprintln!("\nusing {} tool: {}", name, detail);
        HookResult::Continue
    }
}

fn base_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.add_pre_hook(Arc::new(SafetyHook::new()));
    registry.add_pre_hook(Arc::new(ToolAnnouncer));
    registry.add_post_hook(Arc::new(LoggingHook::new()));
    registry
}

pub struct App {
    session: Session,
    conversation: ConversationLoop,
    tools: Vec<AiTool>,
    system_prompt: String,
    max_iterations: usize,
    /// User turns and final answers; tool traffic is not replayed
    history: Vec<Message>,
}

impl App {
    pub async fn new(settings: Settings) -> Result<Self> {
        let client = AiClient::new(settings.client.clone())?;
        tracing::info!(model = %client.model_id(), "Model client ready");
        let provider: Arc<dyn ModelProvider> = Arc::new(client);
        let session = Session::new(settings.working_dir.clone());

        let subagent_tools = base_registry();
        register_all_tools(&subagent_tools).await;

        let registry = base_registry();
        register_all_tools(&registry).await;
        register_agent_tool(
            &registry,
            Arc::clone(&provider),
            Arc::new(subagent_tools),
            AgentToolConfig::new(settings.working_dir.clone())
                .with_parallel_agents(settings.parallel_agents)
                .with_max_iterations(settings.subagent_max_iterations)
                .with_temperature(settings.client.temperature),
        )
        .await;

        let tools = registry.get_ai_tools().await;
        let conversation = ConversationLoop::new(provider, Arc::new(registry), session.tool_context())
            .with_temperature(settings.client.temperature);

        Ok(Self {
            system_prompt: base_system_prompt(&session.working_dir),
            session,
            conversation,
            tools,
            max_iterations: settings.max_iterations,
            history: Vec::new(),
        })
    }

    /// Run one user turn against the running history
    pub async fn run_query(&mut self, input: &str) -> Result<LoopOutcome> {
        self.history.push(Message::user(input));

        let result = self
            .conversation
            .run(
                self.history.clone(),
                Some(&self.system_prompt),
                &self.tools,
                self.max_iterations,
            )
            .await;

        match result {
            Ok(outcome) => {
                self.history.push(Message::assistant(outcome.content.clone()));
                tracing::info!(
                    tool_uses = outcome.tool_use_count,
                    tokens = outcome.total_tokens,
                    files_read = self.session.ledger.len(),
                    "Query finished"
                );
                Ok(outcome)
            }
            Err(e) => {
                self.history.pop();
                Err(e.into())
            }
        }
    }

    pub async fn interactive(&mut self) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        stdout
            .write_all(
                format!(
                    "Quill - interactive mode in {}\nType 'exit' or 'quit' to end the session\n",
                    self.session.working_dir.display()
                )
                .as_bytes(),
            )
            .await?;

        loop {
            stdout.write_all(b"\nYou: ").await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            if EXIT_WORDS.contains(&input.to_lowercase().as_str()) {
                break;
            }

            match self.run_query(input).await {
                Ok(outcome) => {
                    stdout
                        .write_all(format!("\nAssistant: {}\n", outcome.content).as_bytes())
                        .await?;
                }
                Err(e) => {
                    tracing::error!("Query failed: {:#}", e);
                    eprintln!("\nError: {:#}", e);
                }
            }
        }

        stdout.write_all(b"\nGoodbye!\n").await?;
        Ok(())
    }
}
