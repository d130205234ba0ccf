//! TodoWrite tool - Replace the session task list

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::registry::Tool;
use crate::tools::todos::{TodoItem, TodoStatus};
use crate::tools::{parse_params, ToolContext, ToolResult};

pub struct TodoWriteTool;

#[derive(Deserialize)]
struct Params {
    todos: Vec<TodoItem>,
}

/// Grouped, human-readable rendering of the list
fn render(summary: &str, todos: &[TodoItem]) -> String {
    let mut out = vec![format!("{}\n", summary)];
    if todos.is_empty() {
        out.push("(Empty todo list)".to_string());
        return out.join("\n");
    }

    for (status, label) in [
        (TodoStatus::InProgress, "In Progress"),
        (TodoStatus::Pending, "Pending"),
        (TodoStatus::Completed, "Completed"),
    ] {
        let group: Vec<&TodoItem> = todos.iter().filter(|t| t.status == status).collect();
        if group.is_empty() {
            continue;
        }
        out.push(format!("\n{}:", label));
        let mark = if status == TodoStatus::Completed { "[x]" } else { "[ ]" };
        for todo in group {
            let priority = serde_json::to_value(todo.priority)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            out.push(format!("  {} ({}) {}", mark, priority, todo.content));
        }
    }
    out.join("\n")
}

#[async_trait]
impl Tool for TodoWriteTool {
    fn name(&self) -> &str {
        "todo_write"
    }

    fn description(&self) -> &str {
        "Create and manage a structured task list for the current session. Send the full list every time; \
         only one task may be in_progress at a time. Use it for multi-step work, not for trivial requests."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "todos": {
                    "type": "array",
                    "description": "The complete updated todo list",
                    "items": {
                        "type": "object",
                        "properties": {
                            "content": {"type": "string", "description": "Todo content/description"},
                            "status": {"type": "string", "enum": ["pending", "in_progress", "completed"]},
                            "priority": {"type": "string", "enum": ["high", "medium", "low"]},
                            "id": {"type": "string", "description": "Unique ID for the todo"}
                        },
                        "required": ["content", "status", "priority", "id"]
                    }
                }
            },
            "required": ["todos"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> ToolResult {
        let params = match parse_params::<Params>(params) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let changes = match ctx.todos.replace(params.todos) {
            Ok(changes) => changes,
            Err(reason) => {
                return ToolResult::error_with_details(
                    "invalid_parameters",
                    reason,
                    Some(json!({ "todos": ctx.todos.snapshot() })),
                    None,
                )
            }
        };

        let todos = ctx.todos.snapshot();
        let counts = ctx.todos.counts();
        let summary = format!(
            "{} tasks managed ({} pending, {} in progress, {} completed)",
            todos.len(),
            counts.pending,
            counts.in_progress,
            counts.completed
        );
        tracing::debug!(total = todos.len(), changes = changes.len(), "Todo list replaced");

        ToolResult::success_data(json!({
            "content": render(&summary, &todos),
            "summary": summary,
            "todos": todos,
            "changes": changes,
            "pending_count": counts.pending,
            "in_progress_count": counts.in_progress,
            "completed_count": counts.completed
        }))
    }
}
