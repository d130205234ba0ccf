//! Tools for Quill
//!
//! Provides the tool registry, the read-timestamp ledger and file mutation
//! guard, and all built-in tool implementations.

pub mod guard;
pub mod implementations;
pub mod ledger;
pub mod path_utils;
pub mod registry;
pub mod todos;
pub mod truncation;

pub use guard::{FileMutationGuard, GuardError};
pub use implementations::{register_agent_tool, register_all_tools};
pub use ledger::ReadLedger;
pub use registry::{parse_params, Tool, ToolContext, ToolRegistry, ToolResult};
