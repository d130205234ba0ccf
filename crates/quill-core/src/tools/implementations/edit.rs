//! Edit tool - Replace exactly one occurrence of a string in a file

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::guard::{FileMutationGuard, GuardError};
use crate::tools::registry::Tool;
use crate::tools::{parse_params, ToolContext, ToolResult};

pub struct EditTool;

#[derive(Deserialize)]
struct Params {
    file_path: String,
    old_string: String,
    new_string: String,
}

pub(super) fn guard_error(err: GuardError) -> ToolResult {
    ToolResult::error_with_code(err.code(), err)
}

pub(super) fn updated_header(path: &std::path::Path) -> String {
    format!(
        "The file {} has been updated. Here's the result of running `cat -n` on a snippet of the edited file:",
        path.display()
    )
}

#[async_trait]
impl Tool for EditTool {
    fn name(&self) -> &str {
        "edit"
    }

    fn description(&self) -> &str {
        "Replace exactly one occurrence of old_string with new_string in a file. The file must have been read first and not changed since. Use an empty old_string to create a new file."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "The path to the file to modify"
                },
                "old_string": {
                    "type": "string",
                    "description": "The text to replace; must match exactly once. Empty to create a new file."
                },
                "new_string": {
                    "type": "string",
                    "description": "The text to replace it with"
                }
            },
            "required": ["file_path", "old_string", "new_string"],
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

        let plan = match guard
            .apply_edit(&path, &params.old_string, &params.new_string)
            .await
        {
            Ok(plan) => plan,
            Err(e) => return guard_error(e),
        };

        let message = format!("{}\n{}", updated_header(&path), plan.snippet.render());
        let data = json!({
            "message": message,
            "file_path": path.display().to_string(),
            "created": plan.original.is_none(),
            "start_line": plan.snippet.start_line
        });

        ToolResult::success_data_with(data, Vec::new(), Some(plan.diff), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::implementations::ReadTool;
    use tempfile::tempdir;

    fn parsed(result: &ToolResult) -> Value {
        serde_json::from_str(&result.output).unwrap()
    }

    #[tokio::test]
    async fn test_edit_after_read_succeeds() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("a.txt"), "foo\nbar\n").unwrap();
        let ctx = ToolContext {
            working_dir: temp.path().to_path_buf(),
            ..Default::default()
        };

        ReadTool.execute(json!({"file_path": "a.txt"}), &ctx).await;
        let result = EditTool
            .execute(
                json!({"file_path": "a.txt", "old_string": "bar", "new_string": "baz"}),
                &ctx,
            )
            .await;

        assert!(!result.is_error, "{}", result.output);
        let body = parsed(&result);
        assert!(body["data"]["message"]
            .as_str()
            .unwrap()
            .contains("   2 | baz"));
        assert!(body["diff"].as_str().unwrap().contains("+baz"));
        assert_eq!(
            std::fs::read_to_string(temp.path().join("a.txt")).unwrap(),
            "foo\nbaz\n"
        );
    }

    #[tokio::test]
    async fn test_edit_without_read_is_rejected() {
        let temp = tempdir().unwrap();
        std::fs::write(temp.path().join("a.txt"), "foo\n").unwrap();
        let ctx = ToolContext {
            working_dir: temp.path().to_path_buf(),
            ..Default::default()
        };

        let result = EditTool
            .execute(
                json!({"file_path": "a.txt", "old_string": "foo", "new_string": "bar"}),
                &ctx,
            )
            .await;

        assert!(result.is_error);
        assert_eq!(parsed(&result)["error"]["code"], "unread");
        assert_eq!(
            std::fs::read_to_string(temp.path().join("a.txt")).unwrap(),
            "foo\n"
        );
    }

    #[tokio::test]
    async fn test_read_and_edit_through_different_spellings() {
        let temp = tempdir().unwrap();
        std::fs::create_dir(temp.path().join("sub")).unwrap();
        std::fs::write(temp.path().join("a.txt"), "foo\nbar\n").unwrap();
        let ctx = ToolContext {
            working_dir: temp.path().to_path_buf(),
            ..Default::default()
        };

        let read = ReadTool
            .execute(json!({"file_path": "sub/../a.txt"}), &ctx)
            .await;
        assert!(!read.is_error, "{}", read.output);

        let absolute = temp.path().join("./a.txt");
        let result = EditTool
            .execute(
                json!({
                    "file_path": absolute.display().to_string(),
                    "old_string": "foo",
                    "new_string": "baz"
                }),
                &ctx,
            )
            .await;

        assert!(!result.is_error, "{}", result.output);
        assert_eq!(
            std::fs::read_to_string(temp.path().join("a.txt")).unwrap(),
            "baz\nbar\n"
        );
        assert_eq!(ctx.ledger.len(), 1);
    }
}
