//! Tool execution for the conversation loop.
//!
//! Dispatches a batch of tool calls strictly in emitted order and turns each
//! result into a `tool` message correlated by call id.

use std::collections::HashSet;

use crate::ai::types::{AiToolCall, Message};
use crate::constants::tools::MAX_TOOL_OUTPUT_CHARS;
use crate::tools::registry::{ToolContext, ToolRegistry, ToolResult};
use crate::tools::truncation::truncate_envelope;

/// Execute `tool_calls` sequentially. Names outside `offered` are treated as
/// unknown even when the registry knows them.
pub(crate) async fn execute_tools(
    tool_calls: &[AiToolCall],
    registry: &ToolRegistry,
    ctx: &ToolContext,
    offered: &HashSet<String>,
) -> Vec<Message> {
    let mut results = Vec::with_capacity(tool_calls.len());

    for call in tool_calls {
        let result = if offered.contains(&call.name) {
            registry
                .execute(&call.name, call.arguments.clone(), ctx)
                .await
                .unwrap_or_else(|| ToolResult::unknown_tool(&call.name))
        } else {
            ToolResult::unknown_tool(&call.name)
        };

        if result.is_error {
            tracing::debug!(tool = %call.name, id = %call.id, "Tool returned an error result");
        }

        let output = truncate_output(&result.output);
        results.push(Message::tool_result(call.id.clone(), output));
    }

    results
}

/// Results are single-line JSON envelopes, so the cap is applied to their
/// string fields rather than to the raw text
pub(crate) fn truncate_output(output: &str) -> String {
    truncate_envelope(output, MAX_TOOL_OUTPUT_CHARS)
}
