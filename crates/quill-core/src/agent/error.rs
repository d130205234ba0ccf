//! Loop-level agent errors

use thiserror::Error;

use crate::ai::retry::ProviderError;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The model call failed fatally or ran out of retries
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Agent task panicked: {0}")]
    Panicked(String),

    #[error("Agent task was cancelled")]
    Cancelled,
}
