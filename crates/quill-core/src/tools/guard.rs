//! File mutation guard
//!
//! Validates edits and overwrites against the read ledger before anything
//! touches disk, computes the resulting diff, and applies the change while the
//! per-path lock is held.

use std::path::{Path, PathBuf};

use similar::TextDiff;
use thiserror::Error;
use tokio::fs;

use crate::constants::tools::SNIPPET_CONTEXT_LINES;
use crate::tools::ledger::{file_mtime, ReadLedger};

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("No changes to make: old_string and new_string are exactly the same.")]
    NoOp,
    #[error("Cannot create new file - file already exists.")]
    AlreadyExists,
    #[error("File does not exist.")]
    FileNotFound,
    #[error("String to replace not found in file.")]
    TextNotFound,
    #[error("File is a Jupyter Notebook. Use a notebook edit tool instead.")]
    UnsupportedFormat,
    #[error("File has not been read yet. Read it first before writing to it.")]
    Unread,
    #[error(
        "File has been modified since read, either by the user or by a linter. Read it again before attempting to write it."
    )]
    StaleRead,
    #[error(
        "Found {count} matches of the string to replace. For safety, this tool only supports replacing exactly one occurrence at a time. Add more lines of context to your edit and try again."
    )]
    AmbiguousMatch { count: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GuardError {
    /// Stable code for the tool result envelope
    pub fn code(&self) -> &'static str {
        match self {
            GuardError::NoOp => "no_op",
            GuardError::AlreadyExists => "already_exists",
            GuardError::FileNotFound | GuardError::TextNotFound => "not_found",
            GuardError::UnsupportedFormat => "unsupported_format",
            GuardError::Unread => "unread",
            GuardError::StaleRead => "stale_read",
            GuardError::AmbiguousMatch { .. } => "ambiguous_match",
            GuardError::Io(_) => "io_error",
        }
    }
}

/// Lines around a change, numbered from `start_line` (1-based)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub start_line: usize,
    pub lines: Vec<String>,
}

impl Snippet {
    /// `cat -n` style rendering
    pub fn render(&self) -> String {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:4} | {}", self.start_line + i, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A validated edit, ready to be persisted
#[derive(Debug, Clone)]
pub struct EditPlan {
    pub path: PathBuf,
    /// `None` when the edit creates the file
    pub original: Option<String>,
    pub updated: String,
    pub diff: String,
    pub snippet: Snippet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Create,
    Update,
}

impl WriteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WriteKind::Create => "create",
            WriteKind::Update => "update",
        }
    }
}

/// A validated overwrite, ready to be persisted
#[derive(Debug, Clone)]
pub struct WritePlan {
    pub path: PathBuf,
    pub kind: WriteKind,
    pub content: String,
    /// Present only when the file existed with non-empty content
    pub diff: Option<String>,
}

pub struct FileMutationGuard<'a> {
    ledger: &'a ReadLedger,
}

impl<'a> FileMutationGuard<'a> {
    pub fn new(ledger: &'a ReadLedger) -> Self {
        Self { ledger }
    }

    /// Check an edit without touching disk
    pub async fn validate_edit(
        &self,
        path: &Path,
        old_text: &str,
        new_text: &str,
    ) -> Result<EditPlan, GuardError> {
        if old_text == new_text {
            return Err(GuardError::NoOp);
        }

        let exists = fs::try_exists(path).await?;

        if old_text.is_empty() {
            if exists {
                return Err(GuardError::AlreadyExists);
            }
            return Ok(EditPlan {
                path: path.to_path_buf(),
                original: None,
                updated: new_text.to_string(),
                diff: compact_diff("", new_text, path),
                snippet: creation_snippet(new_text),
            });
        }

        if !exists {
            return Err(GuardError::FileNotFound);
        }
        self.check_fresh(path).await?;

        let original = fs::read_to_string(path).await?;
        let start = match original.match_indices(old_text).count() {
            0 => return Err(GuardError::TextNotFound),
            1 => original.find(old_text).unwrap_or_default(),
            count => return Err(GuardError::AmbiguousMatch { count }),
        };

        let updated = format!(
            "{}{}{}",
            &original[..start],
            new_text,
            &original[start + old_text.len()..]
        );
        let diff = compact_diff(&original, &updated, path);
        let snippet = edit_snippet(&original[..start], &updated, new_text);

        Ok(EditPlan {
            path: path.to_path_buf(),
            original: Some(original),
            updated,
            diff,
            snippet,
        })
    }

    /// Check a whole-file overwrite without touching disk
    pub async fn validate_write(&self, path: &Path, content: &str) -> Result<WritePlan, GuardError> {
        if !fs::try_exists(path).await? {
            return Ok(WritePlan {
                path: path.to_path_buf(),
                kind: WriteKind::Create,
                content: content.to_string(),
                diff: None,
            });
        }

        self.check_fresh(path).await?;

        let original = fs::read_to_string(path).await?;
        let diff = (!original.is_empty()).then(|| compact_diff(&original, content, path));

        Ok(WritePlan {
            path: path.to_path_buf(),
            kind: WriteKind::Update,
            content: content.to_string(),
            diff,
        })
    }

    /// Validate, persist and record an edit under the path lock
    pub async fn apply_edit(
        &self,
        path: &Path,
        old_text: &str,
        new_text: &str,
    ) -> Result<EditPlan, GuardError> {
        let _lock = self.ledger.lock(path).await;
        let plan = self.validate_edit(path, old_text, new_text).await?;
        self.persist(path, &plan.updated).await?;
        Ok(plan)
    }

    /// Validate, persist and record an overwrite under the path lock
    pub async fn apply_write(&self, path: &Path, content: &str) -> Result<WritePlan, GuardError> {
        let _lock = self.ledger.lock(path).await;
        let plan = self.validate_write(path, content).await?;
        self.persist(path, &plan.content).await?;
        Ok(plan)
    }

    /// Notebook, read-before-write and staleness checks for an existing file
    async fn check_fresh(&self, path: &Path) -> Result<(), GuardError> {
        if is_notebook(path) {
            return Err(GuardError::UnsupportedFormat);
        }

        let recorded = self.ledger.get(path).ok_or(GuardError::Unread)?;
        if file_mtime(path).await? > recorded {
            return Err(GuardError::StaleRead);
        }
        Ok(())
    }

    async fn persist(&self, path: &Path, content: &str) -> Result<(), GuardError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(path, content).await?;
        self.ledger.record(path, file_mtime(path).await?);
        Ok(())
    }
}

fn is_notebook(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ipynb"))
}

fn compact_diff(old: &str, new: &str, path: &Path) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut output = String::new();
    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        output.push_str(&format!("{}", hunk));
    }
    if output.is_empty() {
        return String::new();
    }
    format!("--- {}\n+++ {}\n{}", path.display(), path.display(), output)
}

fn creation_snippet(content: &str) -> Snippet {
    Snippet {
        start_line: 1,
        lines: content
            .split('\n')
            .take(SNIPPET_CONTEXT_LINES * 2 + 1)
            .map(str::to_string)
            .collect(),
    }
}

/// Context window around a replacement: from `SNIPPET_CONTEXT_LINES` before
/// the first changed line through `SNIPPET_CONTEXT_LINES` after the end of
/// the replacement text.
fn edit_snippet(before: &str, updated: &str, new_text: &str) -> Snippet {
    let replacement_line = before.matches('\n').count();
    let new_lines = new_text.split('\n').count();

    let start = replacement_line.saturating_sub(SNIPPET_CONTEXT_LINES);
    let end = replacement_line + SNIPPET_CONTEXT_LINES + new_lines;

    let lines: Vec<String> = updated
        .split('\n')
        .enumerate()
        .filter(|(i, _)| *i >= start && *i <= end)
        .map(|(_, line)| line.to_string())
        .collect();

    Snippet {
        start_line: start + 1,
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    async fn read_into_ledger(ledger: &ReadLedger, path: &Path) {
        ledger.record(path, file_mtime(path).await.unwrap());
    }

    fn bump_mtime(path: &Path) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();
    }

    #[tokio::test]
    async fn test_noop_edit_rejected() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("a.txt");
        std::fs::write(&path, "same").unwrap();
        let ledger = ReadLedger::new();

        let err = FileMutationGuard::new(&ledger)
            .validate_edit(&path, "same", "same")
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::NoOp));
        assert_eq!(err.code(), "no_op");
    }

    #[tokio::test]
    async fn test_unread_file_rejected_for_edit_and_write() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("a.txt");
        std::fs::write(&path, "foo\n").unwrap();
        let ledger = ReadLedger::new();
        let guard = FileMutationGuard::new(&ledger);

        let err = guard.validate_edit(&path, "foo", "bar").await.unwrap_err();
        assert!(matches!(err, GuardError::Unread));

        let err = guard.validate_write(&path, "bar\n").await.unwrap_err();
        assert!(matches!(err, GuardError::Unread));
    }

    #[tokio::test]
    async fn test_external_modification_is_stale() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("a.txt");
        std::fs::write(&path, "foo\n").unwrap();
        let ledger = ReadLedger::new();
        read_into_ledger(&ledger, &path).await;

        bump_mtime(&path);

        let guard = FileMutationGuard::new(&ledger);
        let err = guard.validate_edit(&path, "foo", "bar").await.unwrap_err();
        assert!(matches!(err, GuardError::StaleRead));
        let err = guard.validate_write(&path, "x").await.unwrap_err();
        assert!(matches!(err, GuardError::StaleRead));
    }

    #[tokio::test]
    async fn test_unique_match_replaces_exactly_that_span() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("a.txt");
        std::fs::write(&path, "alpha\nbeta\ngamma\n").unwrap();
        let ledger = ReadLedger::new();
        read_into_ledger(&ledger, &path).await;

        let plan = FileMutationGuard::new(&ledger)
            .apply_edit(&path, "beta", "BETA")
            .await
            .unwrap();

        assert_eq!(plan.updated, "alpha\nBETA\ngamma\n");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "alpha\nBETA\ngamma\n");
        assert!(plan.diff.contains("-beta"));
        assert!(plan.diff.contains("+BETA"));
    }

    #[tokio::test]
    async fn test_missing_and_ambiguous_text() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("a.txt");
        std::fs::write(&path, "x = 1\nx = 1\n").unwrap();
        let ledger = ReadLedger::new();
        read_into_ledger(&ledger, &path).await;
        let guard = FileMutationGuard::new(&ledger);

        let err = guard.validate_edit(&path, "y = 2", "z").await.unwrap_err();
        assert!(matches!(err, GuardError::TextNotFound));
        assert_eq!(err.code(), "not_found");

        let err = guard.validate_edit(&path, "x = 1", "x = 2").await.unwrap_err();
        assert!(matches!(err, GuardError::AmbiguousMatch { count: 2 }));
        assert!(err.to_string().starts_with("Found 2 matches"));
    }

    #[tokio::test]
    async fn test_create_via_empty_old_text() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested/new.txt");
        let ledger = ReadLedger::new();
        let guard = FileMutationGuard::new(&ledger);

        let plan = guard.apply_edit(&path, "", "hello\n").await.unwrap();
        assert!(plan.original.is_none());
        assert_eq!(plan.snippet.start_line, 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
        assert!(ledger.contains(&path));

        let err = guard.validate_edit(&path, "", "again").await.unwrap_err();
        assert!(matches!(err, GuardError::AlreadyExists));
    }

    #[tokio::test]
    async fn test_missing_file_and_notebook() {
        let temp = tempdir().unwrap();
        let ledger = ReadLedger::new();
        let guard = FileMutationGuard::new(&ledger);

        let err = guard
            .validate_edit(&temp.path().join("missing.rs"), "a", "b")
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::FileNotFound));

        let nb = temp.path().join("analysis.ipynb");
        std::fs::write(&nb, "{}").unwrap();
        read_into_ledger(&ledger, &nb).await;
        let err = guard.validate_edit(&nb, "{}", "[]").await.unwrap_err();
        assert!(matches!(err, GuardError::UnsupportedFormat));
    }

    #[tokio::test]
    async fn test_write_records_new_mtime() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("a.txt");
        std::fs::write(&path, "old\n").unwrap();
        let ledger = ReadLedger::new();
        read_into_ledger(&ledger, &path).await;

        let plan = FileMutationGuard::new(&ledger)
            .apply_write(&path, "new\n")
            .await
            .unwrap();

        assert_eq!(plan.kind, WriteKind::Update);
        assert!(plan.diff.is_some());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
        assert_eq!(ledger.get(&path), Some(file_mtime(&path).await.unwrap()));
    }

    #[tokio::test]
    async fn test_write_empty_existing_file_has_no_diff() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("empty.txt");
        std::fs::write(&path, "").unwrap();
        let ledger = ReadLedger::new();
        read_into_ledger(&ledger, &path).await;

        let plan = FileMutationGuard::new(&ledger)
            .validate_write(&path, "content")
            .await
            .unwrap();
        assert_eq!(plan.kind, WriteKind::Update);
        assert!(plan.diff.is_none());
    }

    #[test]
    fn test_edit_snippet_window() {
        let original: String = (1..=20).map(|i| format!("line {}\n", i)).collect();
        let start = original.find("line 10\n").unwrap();
        let updated = original.replacen("line 10\n", "changed\n", 1);

        let snippet = edit_snippet(&original[..start], &updated, "changed\n");
        // replacement on index 9; window is 5..=15
        assert_eq!(snippet.start_line, 6);
        assert_eq!(snippet.lines.first().map(String::as_str), Some("line 6"));
        assert_eq!(snippet.lines.len(), 11);
        assert!(snippet.render().contains("  10 | changed"));
    }

    #[test]
    fn test_creation_snippet_caps_lines() {
        let content: String = (1..=30).map(|i| format!("{}\n", i)).collect();
        let snippet = creation_snippet(&content);
        assert_eq!(snippet.lines.len(), 9);
        assert_eq!(snippet.start_line, 1);
    }
}
