//! Bash tool - Execute shell commands in the working directory

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::tools::{
    DEFAULT_TOOL_TIMEOUT_SECS, MAX_BASH_OUTPUT_LINES, MAX_BASH_TIMEOUT_SECS, TIMEOUT_EXIT_CODE,
};
use crate::tools::registry::Tool;
use crate::tools::truncation::truncate_middle;
use crate::tools::{parse_params, ToolContext, ToolResult};

/// Slack on top of the command timeout so the tool reports its own timeout
/// before the registry's fires
const REGISTRY_GRACE: Duration = Duration::from_secs(5);

/// Prefer bash when installed, fall back to POSIX sh
static SHELL: Lazy<PathBuf> =
    Lazy::new(|| which::which("bash").unwrap_or_else(|_| PathBuf::from("sh")));

pub struct BashTool;

#[derive(Deserialize)]
struct Params {
    command: String,
    #[serde(default)]
    timeout: Option<u64>,
    #[serde(default)]
    #[allow(dead_code)]
    description: Option<String>,
}

fn clamp_timeout(requested: Option<u64>) -> u64 {
    requested
        .unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS)
        .clamp(1, MAX_BASH_TIMEOUT_SECS)
}

fn build_shell_command(command: &str, ctx: &ToolContext) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new(SHELL.as_path());
        c.arg("-c").arg(command);
        c
    };

    cmd.env("NO_COLOR", "1")
        .current_dir(&ctx.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Execute a shell command in the working directory. Returns stdout, stderr, and exit code. \
         For file operations prefer the read, write, edit, glob and grep tools."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The command to execute"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Optional timeout in seconds (default 120, max 600)"
                },
                "description": {
                    "type": "string",
                    "description": "Clear, concise description of what this command does in 5-10 words"
                }
            },
            "required": ["command"],
            "additionalProperties": false
        })
    }

    fn timeout_override(&self, params: &Value) -> Option<Duration> {
        let requested = params.get("timeout").and_then(|v| v.as_u64());
        Some(Duration::from_secs(clamp_timeout(requested)) + REGISTRY_GRACE)
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> ToolResult {
        let params = match parse_params::<Params>(params) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let timeout_secs = clamp_timeout(params.timeout);
        let child = match build_shell_command(&params.command, ctx).spawn() {
            Ok(c) => c,
            Err(e) => return ToolResult::error(format!("Command execution failed: {}", e)),
        };

        // Dropping the future on timeout drops the child, which kills it
        let output =
            match timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => return ToolResult::error(format!("Command execution failed: {}", e)),
                Err(_) => {
                    tracing::warn!(command = %params.command, timeout_secs, "Command timed out");
                    let message =
                        format!("Command execution timed out after {} seconds", timeout_secs);
                    return ToolResult::error_with_details(
                        "timeout",
                        &message,
                        Some(json!({
                            "stdout": "",
                            "stderr": message,
                            "exit_code": TIMEOUT_EXIT_CODE,
                            "interrupted": true
                        })),
                        None,
                    );
                }
            };

        let stdout = truncate_middle(&String::from_utf8_lossy(&output.stdout), MAX_BASH_OUTPUT_LINES);
        let stderr = truncate_middle(&String::from_utf8_lossy(&output.stderr), MAX_BASH_OUTPUT_LINES);
        let exit_code = output.status.code().unwrap_or(-1);

        let data = json!({
            "stdout": stdout.text,
            "stderr": stderr.text,
            "exit_code": exit_code,
            "interrupted": false,
            "stdout_lines": stdout.lines_total,
            "stderr_lines": stderr.lines_total
        });

        if exit_code == 0 {
            ToolResult::success_data(data)
        } else {
            ToolResult::error_with_details(
                "command_failed",
                format!("Command exited with code {}", exit_code),
                Some(data),
                None,
            )
        }
    }
}
