//! Shared helpers for the file search tools

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::{json, Value};

use crate::constants::tools::MAX_SEARCH_RESULTS;
use crate::tools::{ToolContext, ToolResult};

/// Resolve the optional `path` parameter to an existing directory
pub(super) fn resolve_search_dir(ctx: &ToolContext, path: Option<&str>) -> Result<PathBuf, ToolResult> {
    let dir = path.map_or_else(|| ctx.working_dir.clone(), |p| ctx.resolve_path(p));
    if !dir.exists() {
        return Err(ToolResult::error_with_code(
            "not_found",
            format!("Directory does not exist: {}", dir.display()),
        ));
    }
    if !dir.is_dir() {
        return Err(ToolResult::invalid_parameters(format!(
            "Path is not a directory: {}",
            dir.display()
        )));
    }
    Ok(dir)
}

/// Most recently modified first; unreadable mtimes sort last
pub(super) fn sort_by_mtime(files: &mut [PathBuf]) {
    let mtime = |p: &Path| {
        std::fs::metadata(p)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH)
    };
    files.sort_by_cached_key(|p| std::cmp::Reverse(mtime(p)));
}

/// Cap the list and build the result envelope
pub(super) fn file_list_result(mut files: Vec<PathBuf>, header: bool) -> ToolResult {
    sort_by_mtime(&mut files);
    let total = files.len();
    let truncated = total > MAX_SEARCH_RESULTS;
    files.truncate(MAX_SEARCH_RESULTS);

    let listed: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();

    let content = if listed.is_empty() {
        "No files found".to_string()
    } else {
        let mut out = String::new();
        if header {
            out.push_str(&format!(
                "Found {} file{}\n",
                total,
                if total == 1 { "" } else { "s" }
            ));
        }
        out.push_str(&listed.join("\n"));
        if truncated {
            out.push_str(&format!(
                "\n\n(Results are truncated. Showing {} of {} matches. Consider using a more specific pattern.)",
                listed.len(),
                total
            ));
        }
        out
    };

    let data: Value = json!({
        "content": content,
        "files": listed,
        "num_files": listed.len(),
        "total_matches": total,
        "truncated": truncated
    });
    ToolResult::success_data(data)
}
