//! AI provider layer
//!
//! Handles communication with OpenAI-compatible chat completion APIs

pub mod client;
pub mod provider;
pub mod retry;
pub mod types;

pub use client::{AiClient, AiClientConfig};
pub use provider::ModelProvider;
