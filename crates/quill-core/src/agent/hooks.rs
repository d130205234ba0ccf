//! Hook system for tool execution
//!
//! Allows intercepting tool calls before and after execution
//! for logging, validation, and safety.
//!
//! ## Built-in Hooks
//! - `SafetyHook` - Blocks denylisted shell commands and `cd` outside the working tree
//! - `LoggingHook` - Logs all tool executions with timing

use crate::tools::path_utils::{normalize_path, resolve_in};
use crate::tools::registry::{ToolContext, ToolResult};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Commands refused regardless of arguments, matched on the basename of the
/// first word so `/bin/rm` is caught too
const DENIED_COMMANDS: &[&str] = &[
    "rm", "mkfs", "dd", "format", "fdisk", "shutdown", "reboot", "init", "halt", "poweroff",
];

static FORK_BOMB_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:").unwrap());
static DANGEROUS_REDIRECT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)>\s*/dev/(sd|nvme|vd|xvd|disk)").unwrap());

fn split_shell_segments(command: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;
    let mut chars = command.chars().peekable();

    let mut flush = |current: &mut String| {
        let trimmed = current.trim();
        if !trimmed.is_empty() {
            segments.push(trimmed.to_string());
        }
        current.clear();
    };

    while let Some(ch) = chars.next() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }

        match ch {
            '\\' if !in_single => {
                current.push(ch);
                escaped = true;
            }
            '\'' if !in_double => {
                in_single = !in_single;
                current.push(ch);
            }
            '"' if !in_single => {
                in_double = !in_double;
                current.push(ch);
            }
            ';' | '\n' if !in_single && !in_double => flush(&mut current),
            '|' | '&' if !in_single && !in_double => {
                if matches!(chars.peek(), Some(next) if *next == ch) {
                    let _ = chars.next();
                }
                flush(&mut current);
            }
            _ => current.push(ch),
        }
    }
    flush(&mut current);

    segments
}

fn tokenize_shell(segment: &str) -> Vec<String> {
    shell_words::split(segment).unwrap_or_else(|_| {
        segment
            .split_whitespace()
            .map(ToString::to_string)
            .collect()
    })
}

fn is_env_assignment(token: &str) -> bool {
    let Some((key, _)) = token.split_once('=') else {
        return false;
    };
    !key.is_empty() && key.chars().all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Drop leading `FOO=bar` assignments and privilege wrappers so the real
/// command is what gets checked
fn effective_command(tokens: &[String]) -> &[String] {
    let mut idx = 0;
    while idx < tokens.len()
        && (is_env_assignment(&tokens[idx])
            || matches!(tokens[idx].as_str(), "sudo" | "doas" | "command" | "exec"))
    {
        idx += 1;
    }
    &tokens[idx..]
}

fn command_basename(token: &str) -> &str {
    token.rsplit('/').next().unwrap_or(token)
}

fn cd_target(working_dir: &Path, target: &str) -> PathBuf {
    let expanded = match target.strip_prefix('~') {
        Some(rest) => dirs::home_dir()
            .unwrap_or_default()
            .join(rest.trim_start_matches('/')),
        None => PathBuf::from(target),
    };
    resolve_in(working_dir, &expanded)
}

/// Reason a single shell segment is refused, if any
fn denied_segment_reason(segment: &str, working_dir: &Path) -> Option<String> {
    if FORK_BOMB_PATTERN.is_match(segment) {
        return Some("fork bomb".to_string());
    }
    if DANGEROUS_REDIRECT_PATTERN.is_match(segment) {
        return Some("raw disk redirection".to_string());
    }

    let tokens = tokenize_shell(segment);
    let tokens = effective_command(&tokens);
    let command = command_basename(tokens.first()?);

    if DENIED_COMMANDS.contains(&command) || command.starts_with("mkfs.") {
        return Some(format!(
            "Command '{}' is not allowed for security reasons",
            command
        ));
    }

    if command == "cd" {
        if let Some(target) = tokens.get(1) {
            let resolved = cd_target(working_dir, target);
            if !resolved.starts_with(normalize_path(working_dir)) {
                return Some(format!(
                    "cd to '{}' is not allowed. Can only cd to subdirectories",
                    resolved.display()
                ));
            }
        }
    }

    None
}

/// Result of a hook execution
#[derive(Debug)]
pub enum HookResult {
    /// Continue with execution (no changes)
    Continue,
    /// Block execution with a reason
    Block { reason: String },
}

/// Hook called before tool execution
#[async_trait]
pub trait PreToolHook: Send + Sync {
    async fn before_execute(&self, name: &str, params: &Value, ctx: &ToolContext) -> HookResult;
}

/// Hook called after tool execution
#[async_trait]
pub trait PostToolHook: Send + Sync {
    /// Can inspect the result and duration but typically just logs.
    async fn after_execute(
        &self,
        name: &str,
        params: &Value,
        result: &ToolResult,
        duration: Duration,
    ) -> HookResult;
}

// ============================================================================
// Built-in Hooks
// ============================================================================

/// Safety hook for the `bash` tool
///
/// Every segment of a compound command (`;`, `&&`, `||`, `|`, `&`) is checked:
/// - the first word must not be on the denylist (`rm`, `dd`, `mkfs`, `shutdown`, ...)
/// - `cd` may only move within the working directory
/// - fork bombs and raw disk redirection are refused outright
#[derive(Default)]
pub struct SafetyHook;

impl SafetyHook {
    pub fn new() -> Self {
        Self
    }

    fn check_command(&self, command: &str, working_dir: &Path) -> Option<String> {
        if command.trim().is_empty() {
            return Some("Command cannot be empty".to_string());
        }

        split_shell_segments(command)
            .iter()
            .find_map(|segment| denied_segment_reason(segment, working_dir))
    }
}

#[async_trait]
impl PreToolHook for SafetyHook {
    async fn before_execute(&self, name: &str, params: &Value, ctx: &ToolContext) -> HookResult {
        if name != "bash" {
            return HookResult::Continue;
        }

        let command = params.get("command").and_then(|v| v.as_str()).unwrap_or("");

        if let Some(reason) = self.check_command(command, &ctx.working_dir) {
            tracing::warn!(
                tool = name,
                command = command,
                reason = %reason,
                "Safety hook blocked command"
            );
            return HookResult::Block { reason };
        }

        HookResult::Continue
    }
}

/// Logging hook that logs all tool executions
#[derive(Default)]
pub struct LoggingHook;

impl LoggingHook {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PostToolHook for LoggingHook {
    async fn after_execute(
        &self,
        name: &str,
        _params: &Value,
        result: &ToolResult,
        duration: Duration,
    ) -> HookResult {
        tracing::info!(
            tool = name,
            duration_ms = duration.as_millis() as u64,
            is_error = result.is_error,
            output_len = result.output.len(),
            "Tool execution completed"
        );
        HookResult::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context_in(dir: &str) -> ToolContext {
        ToolContext {
            working_dir: PathBuf::from(dir),
            ..Default::default()
        }
    }

    async fn check(command: &str) -> HookResult {
        SafetyHook::new()
            .before_execute("bash", &json!({ "command": command }), &context_in("/work/repo"))
            .await
    }

    #[tokio::test]
    async fn safety_hook_blocks_denylisted_commands() {
        for command in ["rm -f notes.txt", "/bin/rm x", "dd if=a of=b", "shutdown now"] {
            assert!(
                matches!(check(command).await, HookResult::Block { .. }),
                "{command} should be blocked"
            );
        }
    }

    #[tokio::test]
    async fn safety_hook_checks_every_segment() {
        let result = check("ls -la && FOO=1 rm -rf build").await;
        match result {
            HookResult::Block { reason } => assert!(reason.contains("'rm'")),
            HookResult::Continue => panic!("expected block"),
        }
        assert!(matches!(check("echo hi; sudo reboot").await, HookResult::Block { .. }));
    }

    #[tokio::test]
    async fn safety_hook_restricts_cd_to_working_tree() {
        assert!(matches!(check("cd src/bin").await, HookResult::Continue));
        assert!(matches!(check("cd ./a/../b").await, HookResult::Continue));
        assert!(matches!(check("cd ..").await, HookResult::Block { .. }));
        assert!(matches!(check("cd /etc").await, HookResult::Block { .. }));
        assert!(matches!(
            check("cd /work/repository").await,
            HookResult::Block { .. }
        ));
    }

    #[tokio::test]
    async fn safety_hook_allows_ordinary_commands() {
        assert!(matches!(
            check("ls -la && git status | head -5").await,
            HookResult::Continue
        ));
        assert!(matches!(check("echo 'rm -rf /'").await, HookResult::Continue));
    }

    #[tokio::test]
    async fn safety_hook_ignores_other_tools() {
        let result = SafetyHook::new()
            .before_execute("read", &json!({ "command": "rm -rf /" }), &context_in("/"))
            .await;
        assert!(matches!(result, HookResult::Continue));
    }

    #[tokio::test]
    async fn safety_hook_rejects_empty_command() {
        assert!(matches!(check("   ").await, HookResult::Block { .. }));
    }

    #[test]
    fn test_split_respects_quotes() {
        let segments = split_shell_segments("echo 'a; b' && cat x | wc -l");
        assert_eq!(segments, vec!["echo 'a; b'", "cat x", "wc -l"]);
    }
}
