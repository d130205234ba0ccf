//! Core library for Quill
//!
//! - `ai` - Model provider abstraction, OpenAI-compatible client, retry classification
//! - `tools` - Tool registry, read-timestamp ledger, file mutation guard, built-in tools
//! - `agent` - Conversation loop, parallel sub-agent executor, agent definitions, hooks
//! - `session` - Session-scoped state shared by every tool call of one run

pub mod agent;
pub mod ai;
pub mod config;
pub mod constants;
pub mod paths;
pub mod session;
pub mod tools;

pub use session::Session;
