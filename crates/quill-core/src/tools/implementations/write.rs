//! Write tool - Create or overwrite files

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::edit::{guard_error, updated_header};
use crate::constants::tools::WRITE_PREVIEW_LINES;
use crate::tools::guard::{FileMutationGuard, WriteKind};
use crate::tools::registry::Tool;
use crate::tools::{parse_params, ToolContext, ToolResult};

pub struct WriteTool;

#[derive(Deserialize)]
struct Params {
    file_path: String,
    content: String,
}

fn preview(content: &str) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut out = lines
        .iter()
        .take(WRITE_PREVIEW_LINES)
        .enumerate()
        .map(|(i, line)| format!("{:4} | {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n");
    if lines.len() > WRITE_PREVIEW_LINES {
        out.push_str(&format!(
            "\n... (+{} more lines)",
            lines.len() - WRITE_PREVIEW_LINES
        ));
    }
    out
}

#[async_trait]
impl Tool for WriteTool {
    fn name(&self) -> &str {
        "write"
    }

    fn description(&self) -> &str {
        "Create or overwrite a file. Creates parent directories if needed. Existing files must have been read first and not changed since."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path to the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write to the file"
                }
            },
            "required": ["file_path", "content"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> ToolResult {
        let params = match parse_params::<Params>(params) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let path = ctx.resolve_path(&params.file_path);
        let guard = FileMutationGuard::new(&ctx.ledger);

        let plan = match guard.apply_write(&path, &params.content).await {
            Ok(plan) => plan,
            Err(e) => return guard_error(e),
        };
        info!(path = %path.display(), kind = plan.kind.as_str(), "File written");

        let message = match plan.kind {
            WriteKind::Create => format!(
                "File created successfully at: {} ({} lines)",
                path.display(),
                params.content.split('\n').count()
            ),
            WriteKind::Update => format!("{}\n{}", updated_header(&path), preview(&params.content)),
        };

        let data = json!({
            "message": message,
            "type": plan.kind.as_str(),
            "file_path": path.display().to_string(),
            "bytes_written": params.content.len()
        });

        ToolResult::success_data_with(data, Vec::new(), plan.diff, None)
    }
}
