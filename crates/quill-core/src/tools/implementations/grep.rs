//! Grep tool - Find files whose contents match a regex

use async_trait::async_trait;
use ignore::WalkBuilder;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use super::search::{file_list_result, resolve_search_dir};
use crate::tools::registry::Tool;
use crate::tools::{parse_params, ToolContext, ToolResult};

pub struct GrepTool;

#[derive(Deserialize)]
struct Params {
    pattern: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    include: Option<String>,
}

/// Walk `root` honouring ignore files and collect files containing a match
fn search_files(root: &Path, regex: &Regex, include: Option<&glob::Pattern>) -> Vec<PathBuf> {
    let mut builder = WalkBuilder::new(root);
    builder.hidden(true).follow_links(false).require_git(false);

    let mut out = Vec::new();
    for entry in builder.build() {
        let Ok(entry) = entry else {
            continue;
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(pattern) = include {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            let rel = path.strip_prefix(root).unwrap_or(path);
            if !pattern.matches(&name) && !pattern.matches_path(rel) {
                continue;
            }
        }
        let Ok(bytes) = std::fs::read(path) else {
            continue;
        };
        if regex.is_match(&String::from_utf8_lossy(&bytes)) {
            out.push(path.to_path_buf());
        }
    }
    out
}

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }

    fn description(&self) -> &str {
        "Search file contents with a regular expression. Returns the paths of matching files sorted by modification time. Respects .gitignore."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "The regular expression to search for"
                },
                "path": {
                    "type": "string",
                    "description": "Directory to search in. Defaults to the working directory."
                },
                "include": {
                    "type": "string",
                    "description": "File pattern to include (e.g. '*.rs', '*.{ts,tsx}')"
                }
            },
            "required": ["pattern"],
            "additionalProperties": false
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> ToolResult {
        let params = match parse_params::<Params>(params) {
            Ok(p) => p,
            Err(e) => return e,
        };

        let dir = match resolve_search_dir(ctx, params.path.as_deref()) {
            Ok(d) => d,
            Err(e) => return e,
        };

        let regex = match Regex::new(&params.pattern) {
            Ok(r) => r,
            Err(e) => return ToolResult::invalid_parameters(format!("Invalid regex: {}", e)),
        };
        let include = match params.include.as_deref().map(glob::Pattern::new).transpose() {
            Ok(p) => p,
            Err(e) => {
                return ToolResult::invalid_parameters(format!("Invalid include pattern: {}", e))
            }
        };

        let found =
            tokio::task::spawn_blocking(move || search_files(&dir, &regex, include.as_ref())).await;

        match found {
            Ok(files) => file_list_result(files, true),
            Err(e) => ToolResult::error(format!("Search failed: {}", e)),
        }
    }
}
