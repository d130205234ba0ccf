//! Tool implementations
//!
//! - read: Read files and record the read in the session ledger
//! - write: Create/overwrite files through the mutation guard
//! - edit: Replace one unique snippet through the mutation guard
//! - bash: Execute shell commands
//! - grep: Find files whose contents match a regex
//! - glob: Find files by pattern
//! - todo_write: Replace the session todo list
//! - agent: Delegate a task to one or more sub-agents (needs a model provider)

pub mod agent;
pub mod bash;
pub mod edit;
pub mod glob;
pub mod grep;
pub mod read;
mod search;
pub mod todo_write;
pub mod write;

pub use agent::{AgentTool, AgentToolConfig};
pub use bash::BashTool;
pub use edit::EditTool;
pub use glob::GlobTool;
pub use grep::GrepTool;
pub use read::ReadTool;
pub use todo_write::TodoWriteTool;
pub use write::WriteTool;

use std::sync::Arc;

use crate::ai::provider::ModelProvider;
use crate::tools::registry::ToolRegistry;

/// Register all built-in tools except `agent`
pub async fn register_all_tools(registry: &ToolRegistry) {
    registry.register(Arc::new(ReadTool)).await;
    registry.register(Arc::new(WriteTool)).await;
    registry.register(Arc::new(EditTool)).await;
    registry.register(Arc::new(BashTool)).await;
    registry.register(Arc::new(GrepTool)).await;
    registry.register(Arc::new(GlobTool)).await;
    registry.register(Arc::new(TodoWriteTool)).await;
}

/// Register the agent tool on the top-level registry.
///
/// `subagent_tools` is what sub-agents may call; it should not contain the
/// agent tool itself.
pub async fn register_agent_tool(
    registry: &ToolRegistry,
    provider: Arc<dyn ModelProvider>,
    subagent_tools: Arc<ToolRegistry>,
    config: AgentToolConfig,
) {
    registry
        .register(Arc::new(AgentTool::new(provider, subagent_tools, config)))
        .await;
}
