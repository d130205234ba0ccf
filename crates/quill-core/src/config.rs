//! User configuration file parsing
//!
//! Parses `~/.quill/config.toml`. Every key is optional; missing keys fall
//! back to environment variables and then to built-in defaults.
//!
//! ```toml
//! [ai]
//! model = "gpt-4o"
//! base_url = "https://api.openai.com/v1"
//! temperature = 0.7
//!
//! [agent]
//! parallel_agents = 3
//! max_iterations = 15
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Parsed `config.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuillConfig {
    #[serde(default)]
    pub ai: AiSection,
    #[serde(default)]
    pub agent: AgentSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiSection {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentSection {
    pub parallel_agents: Option<usize>,
    pub max_iterations: Option<usize>,
    pub subagent_max_iterations: Option<usize>,
}

impl QuillConfig {
    /// Load config from the given path; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file found at {:?}", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?;

        let config = Self::parse(&content).with_context(|| format!("Failed to parse {:?}", path))?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = tempdir().unwrap();
        let config = QuillConfig::load(&temp.path().join("config.toml")).unwrap();
        assert!(config.ai.model.is_none());
        assert!(config.agent.parallel_agents.is_none());
    }

    #[test]
    fn test_parse_sections() {
        let config = QuillConfig::parse(
            r#"
[ai]
model = "gpt-4o-mini"
temperature = 0.2

[agent]
parallel_agents = 3
"#,
        )
        .unwrap();

        assert_eq!(config.ai.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.ai.temperature, Some(0.2));
        assert_eq!(config.agent.parallel_agents, Some(3));
        assert!(config.agent.max_iterations.is_none());
    }

    #[test]
    fn test_parse_rejects_malformed_toml() {
        assert!(QuillConfig::parse("[ai\nmodel = ").is_err());
    }
}
