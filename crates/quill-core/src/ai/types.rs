//! AI SDK types for provider communication
//!
//! The transcript (`Vec<Message>`) is the causal history fed back to the model
//! every turn, so its order matters.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// AI SDK Tool definition (for provider communication only)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl AiTool {
    /// Render as an OpenAI `tools[]` entry
    pub fn to_openai(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema,
            }
        })
    }
}

/// AI SDK Tool call (for provider communication only)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Message role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// One transcript entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<AiToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// Assistant turn that requested tool calls
    pub fn assistant_with_tools(content: Option<String>, tool_calls: Vec<AiToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Tool result correlated to the call that produced it
    pub fn tool_result(tool_call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(output.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }
}

/// Finish reasons for model generation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    pub fn from_api(reason: &str) -> Self {
        match reason {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "tool_calls" | "function_call" => Self::ToolCalls,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Usage information
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// One request to the remote model
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system_prompt: Option<String>,
    pub messages: Vec<Message>,
    /// Empty means the model is called without tools
    pub tools: Vec<AiTool>,
    pub temperature: f32,
}

/// The model's reply to one request
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<AiToolCall>,
    pub usage: Usage,
    pub finish_reason: FinishReason,
}

impl ModelResponse {
    /// Plain text reply with no tool calls
    pub fn text(content: impl Into<String>, total_tokens: usize) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
            usage: Usage {
                total_tokens,
                ..Default::default()
            },
            finish_reason: FinishReason::Stop,
        }
    }

    /// Reply that asks for the given tool calls
    pub fn tool_calls(calls: Vec<AiToolCall>, total_tokens: usize) -> Self {
        Self {
            content: None,
            tool_calls: calls,
            usage: Usage {
                total_tokens,
                ..Default::default()
            },
            finish_reason: FinishReason::ToolCalls,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
