//! Agent personas
//!
//! A persona is a system prompt plus a tool allowlist. One built-in persona
//! ships with the binary; projects add their own as markdown files under
//! `.quill/agents/` with a YAML header:
//!
//! ```markdown
//! ---
//! agent-type: reviewer
//! when-to-use: Reviewing diffs for correctness
//! allowed-tools: read, grep, glob
//! ---
//! You are a meticulous code reviewer...
//! ```
//!
//! Definitions are scanned from disk on every lookup.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::ai::types::AiTool;
use crate::constants::agent::DEFAULT_AGENT_TYPE;
use crate::paths::project_agents_dir;

static FRONTMATTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^---\s*\n(.*?)\n---\s*\n(.*)$").unwrap());

/// Which tools a persona may call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedTools {
    All,
    Only(BTreeSet<String>),
}

impl AllowedTools {
    /// Build from a list of names; empty or containing `*` means all
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        if set.is_empty() || set.contains("*") {
            Self::All
        } else {
            Self::Only(set)
        }
    }

    pub fn allows(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(set) => set.contains(name),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::All => "*".to_string(),
            Self::Only(set) => set.iter().cloned().collect::<Vec<_>>().join(", "),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentOrigin {
    BuiltIn,
    Project,
}

/// A loaded agent persona
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub agent_type: String,
    pub when_to_use: String,
    pub allowed_tools: AllowedTools,
    pub system_prompt: String,
    pub origin: AgentOrigin,
    pub file_path: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("Failed to read agent definition {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML header in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct Header {
    #[serde(default, rename = "agent-type", alias = "agent_type")]
    agent_type: Option<String>,
    #[serde(default, rename = "when-to-use", alias = "when_to_use")]
    when_to_use: Option<String>,
    #[serde(default, rename = "allowed-tools", alias = "allowed_tools")]
    allowed_tools: Option<ToolList>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ToolList {
    Csv(String),
    List(Vec<String>),
}

impl ToolList {
    fn into_allowed(self) -> AllowedTools {
        match self {
            ToolList::Csv(s) => AllowedTools::from_names(s.split(',')),
            ToolList::List(v) => AllowedTools::from_names(v),
        }
    }
}

/// The persona used when the model does not ask for one
pub fn built_in_agents() -> Vec<AgentConfig> {
    vec![AgentConfig {
        agent_type: DEFAULT_AGENT_TYPE.to_string(),
        when_to_use:
            "General-purpose agent for researching, searching code, and multi-step tasks"
                .to_string(),
        allowed_tools: AllowedTools::All,
        system_prompt: r#"You are an agent for a coding assistant. Given the user's message, use the available tools to complete the task.

Your strengths:
- Searching for code, configurations, and patterns across codebases
- Analyzing multiple files to understand system architecture
- Performing multi-step research tasks

Guidelines:
- Be thorough and check multiple locations
- Consider different naming conventions
- In your final response, share relevant details and findings
- Provide clear, actionable information"#
            .to_string(),
        origin: AgentOrigin::BuiltIn,
        file_path: None,
    }]
}

/// Parse one definition file. `Ok(None)` when the file has no header or is
/// missing `agent-type`/`when-to-use`.
pub fn parse_definition(content: &str, path: &Path) -> Result<Option<AgentConfig>, DefinitionError> {
    let Some(caps) = FRONTMATTER.captures(content) else {
        return Ok(None);
    };
    let header_text = caps.get(1).map_or("", |m| m.as_str());
    let body = caps.get(2).map_or("", |m| m.as_str());

    let header: Header = if header_text.trim().is_empty() {
        Header::default()
    } else {
        serde_yaml::from_str(header_text).map_err(|source| DefinitionError::Yaml {
            path: path.to_path_buf(),
            source,
        })?
    };

    let (Some(agent_type), Some(when_to_use)) = (header.agent_type, header.when_to_use) else {
        debug!(path = %path.display(), "Agent definition missing agent-type or when-to-use, skipping");
        return Ok(None);
    };
    if agent_type.trim().is_empty() || when_to_use.trim().is_empty() {
        return Ok(None);
    }

    Ok(Some(AgentConfig {
        agent_type,
        when_to_use,
        allowed_tools: header
            .allowed_tools
            .map_or(AllowedTools::All, ToolList::into_allowed),
        system_prompt: body.trim().to_string(),
        origin: AgentOrigin::Project,
        file_path: Some(path.to_path_buf()),
    }))
}

/// Load one definition file from disk
pub fn load_definition(path: &Path) -> Result<Option<AgentConfig>, DefinitionError> {
    let content = std::fs::read_to_string(path).map_err(|source| DefinitionError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_definition(&content, path)
}

/// Scan `dir` recursively for `.md` definitions, skipping hidden directories.
/// Files that fail to load are logged and skipped.
pub fn scan_agent_files(dir: &Path) -> Vec<AgentConfig> {
    if !dir.is_dir() {
        return Vec::new();
    }

    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| {
            let hidden_dir = entry.depth() > 0
                && entry.file_type().is_some_and(|t| t.is_dir())
                && entry.file_name().to_string_lossy().starts_with('.');
            !hidden_dir
        })
        .build();

    let mut agents = Vec::new();
    for entry in walker.flatten() {
        let path = entry.path();
        if !entry.file_type().is_some_and(|t| t.is_file())
            || path.extension().and_then(|e| e.to_str()) != Some("md")
        {
            continue;
        }
        match load_definition(path) {
            Ok(Some(agent)) => {
                debug!(agent_type = %agent.agent_type, path = %path.display(), "Loaded agent definition");
                agents.push(agent);
            }
            Ok(None) => {}
            Err(e) => warn!("{}", e),
        }
    }
    agents
}

/// Built-in personas followed by the project's definitions
pub fn load_all_agents(project_dir: &Path) -> Vec<AgentConfig> {
    let mut agents = built_in_agents();
    agents.extend(scan_agent_files(&project_agents_dir(project_dir)));
    agents
}

/// First persona with the given type; built-ins win over project files
pub fn find_agent(agent_type: &str, project_dir: &Path) -> Option<AgentConfig> {
    load_all_agents(project_dir)
        .into_iter()
        .find(|a| a.agent_type == agent_type)
}

/// Restrict `tools` to what `config` allows
pub fn filter_tools(config: &AgentConfig, tools: &[AiTool]) -> Vec<AiTool> {
    tools
        .iter()
        .filter(|t| config.allowed_tools.allows(&t.name))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn tool(name: &str) -> AiTool {
        AiTool {
            name: name.to_string(),
            description: String::new(),
            input_schema: json!({"type": "object"}),
        }
    }

    #[test]
    fn test_parse_kebab_and_csv_tools() {
        let doc = "---\nagent-type: reviewer\nwhen-to-use: Reviewing diffs\nallowed-tools: read, grep\n---\nBe strict.\n";
        let agent = parse_definition(doc, Path::new("r.md")).unwrap().unwrap();

        assert_eq!(agent.agent_type, "reviewer");
        assert_eq!(agent.system_prompt, "Be strict.");
        assert_eq!(agent.origin, AgentOrigin::Project);
        assert!(agent.allowed_tools.allows("read"));
        assert!(!agent.allowed_tools.allows("bash"));
    }

    #[test]
    fn test_parse_snake_case_and_list_tools() {
        let doc = "---\nagent_type: fixer\nwhen_to_use: Fixing\nallowed_tools:\n  - edit\n  - read\n---\nFix it.\n";
        let agent = parse_definition(doc, Path::new("f.md")).unwrap().unwrap();
        assert_eq!(
            agent.allowed_tools,
            AllowedTools::Only(["edit".to_string(), "read".to_string()].into())
        );
    }

    #[test]
    fn test_missing_required_field_skips() {
        let doc = "---\nagent-type: lonely\n---\nbody\n";
        assert!(parse_definition(doc, Path::new("x.md")).unwrap().is_none());
        assert!(parse_definition("no header", Path::new("x.md")).unwrap().is_none());
    }

    #[test]
    fn test_empty_or_star_tools_mean_all() {
        assert_eq!(AllowedTools::from_names(Vec::<String>::new()), AllowedTools::All);
        assert_eq!(AllowedTools::from_names(["read", "*"]), AllowedTools::All);
    }

    #[test]
    fn test_scan_recurses_and_skips_hidden_dirs() {
        let temp = tempdir().unwrap();
        let agents_dir = project_agents_dir(temp.path());
        std::fs::create_dir_all(agents_dir.join("nested")).unwrap();
        std::fs::create_dir_all(agents_dir.join(".hidden")).unwrap();

        let def = |t: &str| format!("---\nagent-type: {}\nwhen-to-use: testing\n---\nprompt\n", t);
        std::fs::write(agents_dir.join("top.md"), def("top")).unwrap();
        std::fs::write(agents_dir.join("nested/deep.md"), def("deep")).unwrap();
        std::fs::write(agents_dir.join(".hidden/secret.md"), def("secret")).unwrap();
        std::fs::write(agents_dir.join("notes.txt"), def("txt")).unwrap();

        let agents = load_all_agents(temp.path());
        let types: Vec<&str> = agents.iter().map(|a| a.agent_type.as_str()).collect();

        assert_eq!(types[0], "general-purpose");
        assert!(types.contains(&"top"));
        assert!(types.contains(&"deep"));
        assert!(!types.contains(&"secret"));
        assert!(!types.contains(&"txt"));
    }

    #[test]
    fn test_find_agent_prefers_built_in() {
        let temp = tempdir().unwrap();
        let agents_dir = project_agents_dir(temp.path());
        std::fs::create_dir_all(&agents_dir).unwrap();
        std::fs::write(
            agents_dir.join("gp.md"),
            "---\nagent-type: general-purpose\nwhen-to-use: shadow\n---\nshadow\n",
        )
        .unwrap();

        let agent = find_agent("general-purpose", temp.path()).unwrap();
        assert_eq!(agent.origin, AgentOrigin::BuiltIn);
        assert!(find_agent("missing", temp.path()).is_none());
    }

    #[test]
    fn test_filter_tools() {
        let tools = vec![tool("bash"), tool("read"), tool("grep")];
        let mut config = built_in_agents().remove(0);
        assert_eq!(filter_tools(&config, &tools).len(), 3);

        config.allowed_tools = AllowedTools::from_names(["read", "grep", "missing"]);
        let names: Vec<String> = filter_tools(&config, &tools).into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["read", "grep"]);
    }
}
