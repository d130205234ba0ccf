//! Read tool - Read file contents and record the read in the ledger

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::fs;

use crate::constants::tools::{BINARY_SNIFF_BYTES, MAX_READ_BYTES, MAX_READ_OUTPUT_CHARS};
use crate::tools::ledger::file_mtime;
use crate::tools::registry::Tool;
use crate::tools::{parse_params, ToolContext, ToolResult};

pub struct ReadTool;

#[derive(Deserialize)]
struct Params {
    file_path: String,
    #[serde(default)]
    offset: Option<usize>,
    #[serde(default)]
    limit: Option<usize>,
}

fn format_size(size: usize) -> String {
    match size {
        0..=1023 => format!("{} bytes", size),
        1024..=1_048_575 => format!("{:.1} KB", size as f64 / 1024.0),
        _ => format!("{:.1} MB", size as f64 / 1_048_576.0),
    }
}

/// Number lines `{:6}|{line}` starting at `first_line`
fn number_lines(lines: &[&str], first_line: usize) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:6}|{}", first_line + i, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Last line index (exclusive) whose numbered rendering fits in `max_chars`.
/// At least one line is always returned.
fn capped_end(lines: &[&str], start: usize, end: usize, max_chars: usize) -> usize {
    let mut used = 0;
    for (i, line) in lines[start..end].iter().enumerate() {
        let width = (start + i + 1).to_string().len().max(6) + 2 + line.len();
        if i > 0 && used + width > max_chars {
            return start + i;
        }
        used += width;
    }
    end
}

#[async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &str {
        "read"
    }

    fn description(&self) -> &str {
        "Read a file from the filesystem. Output is line-numbered. Use offset/limit for large files. A file must be read before it can be edited or overwritten."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path to the file to read (absolute or relative)"
                },
                "offset": {
                    "type": "integer",
                    "description": "Line number to start reading from (1-indexed)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Number of lines to read"
                }
            },
            "required": ["file_path"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> ToolResult {
        let params = match parse_params::<Params>(params) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let path = ctx.resolve_path(&params.file_path);
        let _lock = ctx.ledger.lock(&path).await;

        let metadata = match fs::metadata(&path).await {
            Ok(m) => m,
            Err(_) => return ToolResult::error_with_code("not_found", "File does not exist."),
        };
        if metadata.is_dir() {
            return ToolResult::error_with_code("is_directory", "Path is a directory, not a file.");
        }

        let windowed = params.offset.is_some() || params.limit.is_some();
        let size = metadata.len() as usize;
        if size > MAX_READ_BYTES && !windowed {
            return ToolResult::error_with_code(
                "too_large",
                format!(
                    "File too large ({}). Maximum size is {}. Use offset and limit parameters to read specific portions.",
                    format_size(size),
                    format_size(MAX_READ_BYTES)
                ),
            );
        }

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => return ToolResult::error(format!("Failed to read file: {}", e)),
        };

        let mtime = match file_mtime(&path).await {
            Ok(t) => t,
            Err(e) => return ToolResult::error(format!("Failed to stat file: {}", e)),
        };
        ctx.ledger.record(&path, mtime);

        let check_len = bytes.len().min(BINARY_SNIFF_BYTES);
        if bytes[..check_len].contains(&0) {
            return ToolResult::success_data(json!({
                "content": format!("Binary file: {} ({})", path.display(), format_size(bytes.len())),
                "file_path": path.display().to_string(),
                "total_lines": 0,
                "lines_returned": 0
            }));
        }

        let text = String::from_utf8_lossy(&bytes);
        let lines: Vec<&str> = text.lines().collect();
        let total_lines = lines.len();

        if total_lines == 0 {
            return ToolResult::success_data(json!({
                "content": "File is empty.",
                "file_path": path.display().to_string(),
                "total_lines": 0,
                "lines_returned": 0
            }));
        }

        let start = params.offset.unwrap_or(1).saturating_sub(1);
        if start >= total_lines {
            return ToolResult::invalid_parameters(format!(
                "Start line {} is beyond file length ({})",
                start + 1,
                total_lines
            ));
        }
        let requested_end = params
            .limit
            .map_or(total_lines, |limit| (start + limit).min(total_lines));
        let end = capped_end(&lines, start, requested_end, MAX_READ_OUTPUT_CHARS);

        let mut content = number_lines(&lines[start..end], start + 1);
        if end < requested_end {
            content.push_str(&format!(
                "\n\n(Showing lines {}-{} of {} total lines. Output capped at {} characters; use offset={} to continue.)",
                start + 1,
                end,
                total_lines,
                MAX_READ_OUTPUT_CHARS,
                end + 1
            ));
        } else if end - start < total_lines {
            content.push_str(&format!(
                "\n\n(Showing lines {}-{} of {} total lines)",
                start + 1,
                end,
                total_lines
            ));
        }

        if windowed && content.len() > MAX_READ_BYTES {
            return ToolResult::error_with_code(
                "too_large",
                format!(
                    "File content too large ({}). Use offset and limit parameters to read specific portions.",
                    format_size(content.len())
                ),
            );
        }

        ToolResult::success_data(json!({
            "content": content,
            "file_path": path.display().to_string(),
            "total_lines": total_lines,
            "lines_returned": end - start,
            "start_line": start + 1
        }))
    }
}
