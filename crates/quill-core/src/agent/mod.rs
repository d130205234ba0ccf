//! Agent system for Quill
//!
//! ## Conversation
//! - `ConversationLoop` - Bounded tool-calling loop with rate-limit retry
//! - `LoopOutcome` / `LoopFinish` - How a run ended
//!
//! ## Sub-agents
//! - `ParallelAgentExecutor` - Fan-out to N participants plus synthesis
//! - `AgentConfig` - Personas, built-in and loaded from `.quill/agents`
//!
//! ## Hooks
//! - `SafetyHook` - Blocks dangerous bash commands
//! - `LoggingHook` - Logs all tool executions

pub mod conversation;
pub mod definitions;
mod error;
pub(crate) mod executor;
pub mod hooks;
pub mod parallel;
pub mod prompts;
#[cfg(test)]
pub(crate) mod testing;

pub use conversation::{ConversationLoop, LoopFinish, LoopOutcome};
pub use definitions::{filter_tools, find_agent, load_all_agents, AgentConfig, AllowedTools};
pub use error::AgentError;
pub use hooks::{LoggingHook, SafetyHook};
pub use parallel::{AgentResult, FanOutOutcome, ParallelAgentExecutor};
