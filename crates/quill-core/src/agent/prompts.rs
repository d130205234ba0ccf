//! Prompt text shared by the main loop and sub-agents

use std::path::Path;

use super::parallel::AgentResult;

/// Base system prompt for every conversation
pub fn base_system_prompt(working_dir: &Path) -> String {
    format!(
        r#"You are Quill, an interactive coding assistant running in the user's terminal.

Working directory: {}

Use the available tools to inspect and change the project:
- glob and grep to locate files, read to view them
- edit to replace one unique snippet, write to create or overwrite a file
- bash for builds, tests and other commands
- todo_write to track multi-step work

Rules:
- Read a file before editing or overwriting it. Edits against stale or unread files are rejected.
- Keep `old_string` unique by including surrounding context.
- Prefer small, focused changes and verify them.
- Be concise. Answer directly once the task is done."#,
        working_dir.display()
    )
}

/// Base prompt followed by the persona prompt
pub fn combined_system_prompt(base: &str, persona: &str) -> String {
    format!("{}\n\n{}", base, persona)
}

/// Prompt for the tool-free pass that merges participant outputs.
/// `results` must already be sorted by agent index.
pub fn synthesis_prompt(task: &str, results: &[AgentResult]) -> String {
    let sections: Vec<String> = results
        .iter()
        .map(|r| format!("== AGENT {} RESPONSE ==\n{}\n", r.agent_index + 1, r.content))
        .collect();

    format!(
        r#"Original task: {}

I've assigned multiple agents to tackle this task. Each agent has analyzed the problem and provided their findings.

{}

Based on all the information provided by these agents, synthesize a comprehensive and cohesive response that:
1. Combines the key insights from all agents
2. Resolves any contradictions between agent findings
3. Presents a unified solution that addresses the original task
4. Includes all important details from the individual responses
5. Is well-structured and complete

Your synthesis should be thorough but focused on the original task."#,
        task,
        sections.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_synthesis_prompt_numbers_agents_from_one() {
        let results = vec![
            AgentResult {
                agent_index: 0,
                content: "first".into(),
                tool_use_count: 1,
                token_count: 10,
                duration: Duration::ZERO,
            },
            AgentResult {
                agent_index: 1,
                content: "second".into(),
                tool_use_count: 0,
                token_count: 5,
                duration: Duration::ZERO,
            },
        ];

        let prompt = synthesis_prompt("count files", &results);
        assert!(prompt.starts_with("Original task: count files"));
        assert!(prompt.contains("== AGENT 1 RESPONSE ==\nfirst"));
        assert!(prompt.contains("== AGENT 2 RESPONSE ==\nsecond"));
    }

    #[test]
    fn test_combined_prompt_order() {
        assert_eq!(combined_system_prompt("base", "persona"), "base\n\npersona");
    }
}
