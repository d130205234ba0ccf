//! Runtime settings: defaults, then config file, then environment, then flags

use std::path::PathBuf;

use anyhow::{Context, Result};
use quill_core::ai::AiClientConfig;
use quill_core::config::QuillConfig;
use quill_core::constants::agent::{
    DEFAULT_PARALLEL_AGENTS, MAIN_MAX_ITERATIONS, MAX_PARALLEL_AGENTS, SUBAGENT_MAX_ITERATIONS,
};

/// Fan-out width override
pub const ENV_PARALLEL_AGENTS: &str = "PARALLEL_AGENTS";

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub parallel_agents: Option<usize>,
    pub max_iterations: Option<usize>,
    pub cwd: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub client: AiClientConfig,
    pub parallel_agents: usize,
    pub max_iterations: usize,
    pub subagent_max_iterations: usize,
    pub working_dir: PathBuf,
}

impl Settings {
    pub fn resolve(file: &QuillConfig, overrides: Overrides) -> Result<Self> {
        Self::resolve_with(file, overrides, |key| std::env::var(key).ok())
    }

    pub fn resolve_with(
        file: &QuillConfig,
        overrides: Overrides,
        env: impl Fn(&str) -> Option<String> + Copy,
    ) -> Result<Self> {
        let mut client = AiClientConfig::resolve_with(file, env);
        if let Some(model) = overrides.model {
            client.model = model;
        }

        let env_parallel = match env(ENV_PARALLEL_AGENTS).filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(
                raw.trim()
                    .parse::<usize>()
                    .with_context(|| format!("{} must be a positive integer, got '{}'", ENV_PARALLEL_AGENTS, raw))?,
            ),
            None => None,
        };
        let parallel_agents = overrides
            .parallel_agents
            .or(env_parallel)
            .or(file.agent.parallel_agents)
            .unwrap_or(DEFAULT_PARALLEL_AGENTS)
            .clamp(1, MAX_PARALLEL_AGENTS);

        let max_iterations = overrides
            .max_iterations
            .or(file.agent.max_iterations)
            .unwrap_or(MAIN_MAX_ITERATIONS)
            .max(1);
        let subagent_max_iterations = file
            .agent
            .subagent_max_iterations
            .unwrap_or(SUBAGENT_MAX_ITERATIONS)
            .max(1);

        let working_dir = match overrides.cwd {
            Some(dir) => dir
                .canonicalize()
                .with_context(|| format!("Working directory {:?} is not accessible", dir))?,
            None => std::env::current_dir().context("Failed to read current directory")?,
        };

        Ok(Self {
            client,
            parallel_agents,
            max_iterations,
            subagent_max_iterations,
            working_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve_with(&QuillConfig::default(), Overrides::default(), no_env).unwrap();
        assert_eq!(settings.parallel_agents, 1);
        assert_eq!(settings.max_iterations, 15);
        assert_eq!(settings.subagent_max_iterations, 10);
        assert_eq!(settings.client.model, "gpt-4");
    }

    #[test]
    fn test_precedence_flag_over_env_over_file() {
        let file = QuillConfig::parse("[agent]\nparallel_agents = 2\n").unwrap();
        let env = |key: &str| (key == ENV_PARALLEL_AGENTS).then(|| "3".to_string());

        let settings = Settings::resolve_with(&file, Overrides::default(), env).unwrap();
        assert_eq!(settings.parallel_agents, 3);

        let overrides = Overrides {
            parallel_agents: Some(4),
            model: Some("gpt-4o".into()),
            ..Default::default()
        };
        let settings = Settings::resolve_with(&file, overrides, env).unwrap();
        assert_eq!(settings.parallel_agents, 4);
        assert_eq!(settings.client.model, "gpt-4o");
    }

    #[test]
    fn test_invalid_parallel_env_is_an_error() {
        let env = |key: &str| (key == ENV_PARALLEL_AGENTS).then(|| "many".to_string());
        let err = Settings::resolve_with(&QuillConfig::default(), Overrides::default(), env).unwrap_err();
        assert!(err.to_string().contains("PARALLEL_AGENTS"));
    }

    #[test]
    fn test_cwd_override() {
        let temp = tempdir().unwrap();
        let overrides = Overrides {
            cwd: Some(temp.path().to_path_buf()),
            ..Default::default()
        };
        let settings = Settings::resolve_with(&QuillConfig::default(), overrides, no_env).unwrap();
        assert_eq!(settings.working_dir, temp.path().canonicalize().unwrap());
    }
}
