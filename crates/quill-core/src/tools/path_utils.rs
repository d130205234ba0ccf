//! Shared path utilities for tools and hooks

use std::path::{Component, Path, PathBuf};

/// Lexically resolve `.` and `..` without touching the filesystem.
///
/// Ledger keys go through this, so two spellings of one file share an entry.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Join `path` onto `working_dir` unless it is absolute, then normalize
pub fn resolve_in(working_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&working_dir.join(path))
    }
}
