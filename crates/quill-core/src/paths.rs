//! Centralized path utilities
//!
//! All application paths in one place for consistency

use std::path::{Path, PathBuf};

use crate::constants::paths;

/// Get the quill config directory (~/.quill)
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(paths::CONFIG_DIR_NAME)
}

/// Get the logs directory (~/.quill/logs)
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}

/// Get the config file (~/.quill/config.toml)
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Project agent definitions directory (<project>/.quill/agents)
pub fn project_agents_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(paths::PROJECT_AGENTS_DIR)
}
