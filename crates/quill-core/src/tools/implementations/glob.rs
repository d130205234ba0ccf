//! Glob tool - Find files by name pattern

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;

use super::search::{file_list_result, resolve_search_dir};
use crate::tools::registry::Tool;
use crate::tools::{parse_params, ToolContext, ToolResult};

pub struct GlobTool;

#[derive(Deserialize)]
struct Params {
    pattern: String,
    #[serde(default)]
    path: Option<String>,
}

#[async_trait]
impl Tool for GlobTool {
    fn name(&self) -> &str {
        "glob"
    }

    fn description(&self) -> &str {
        "Find files by glob pattern (e.g. '**/*.rs'). Returns matching files sorted by modification time, newest first."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "The glob pattern to match files against (e.g. '**/*.py', 'src/**/*.js')"
                },
                "path": {
                    "type": "string",
                    "description": "Directory to search in. Defaults to the working directory."
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

        let full_pattern = dir.join(&params.pattern).to_string_lossy().into_owned();
        let matched = tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>, String> {
            let paths = glob::glob(&full_pattern).map_err(|e| e.to_string())?;
            Ok(paths.filter_map(Result::ok).filter(|p| p.is_file()).collect())
        })
        .await;

        match matched {
            Ok(Ok(files)) => file_list_result(files, false),
            Ok(Err(e)) => ToolResult::invalid_parameters(format!("Invalid glob pattern: {}", e)),
            Err(e) => ToolResult::error(format!("Glob operation failed: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_glob_matches_files_only() {
        let temp = tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join("src/nested.rs")).unwrap();
        std::fs::write(temp.path().join("src/lib.rs"), "").unwrap();
        std::fs::write(temp.path().join("README.md"), "").unwrap();
        let ctx = ToolContext {
            working_dir: temp.path().to_path_buf(),
            ..Default::default()
        };

        let result = GlobTool.execute(json!({"pattern": "**/*.rs"}), &ctx).await;
        let parsed: Value = serde_json::from_str(&result.output).unwrap();
        let files = parsed["data"]["files"].as_array().unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].as_str().unwrap().ends_with("lib.rs"));
    }

    #[tokio::test]
    async fn test_glob_missing_directory() {
        let temp = tempdir().unwrap();
        let ctx = ToolContext {
            working_dir: temp.path().to_path_buf(),
            ..Default::default()
        };

        let result = GlobTool
            .execute(json!({"pattern": "*", "path": "missing"}), &ctx)
            .await;
        assert!(result.is_error);
        assert!(result.output.contains("Directory does not exist"));
    }
}
