//! Centralized constants

pub mod ai {
    /// Default model when neither config, env, nor CLI names one
    pub const DEFAULT_MODEL: &str = "gpt-4";

    /// Default OpenAI-compatible chat completions endpoint
    pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

    /// Sampling temperature for every conversation turn
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;

    /// Total attempts (first call included) for a rate-limited request
    pub const RETRY_ATTEMPTS: u32 = 10;

    /// Base backoff delay, doubled on every attempt
    pub const RETRY_BASE_DELAY_MS: u64 = 2_000;

    /// HTTP request timeout for a single model call
    pub const REQUEST_TIMEOUT_SECS: u64 = 300;
}

pub mod agent {
    /// Iteration bound for the top-level conversation
    pub const MAIN_MAX_ITERATIONS: usize = 15;

    /// Iteration bound for each sub-agent participant
    pub const SUBAGENT_MAX_ITERATIONS: usize = 10;

    /// Number of sub-agents the `agent` tool fans out to by default
    pub const DEFAULT_PARALLEL_AGENTS: usize = 1;

    /// Upper bound on fan-out width
    pub const MAX_PARALLEL_AGENTS: usize = 8;

    /// Agent type used when the model does not name one
    pub const DEFAULT_AGENT_TYPE: &str = "general-purpose";

    /// Content returned when a loop runs out of iterations
    pub const ITERATION_LIMIT_MESSAGE: &str = "Maximum tool call iterations reached";

    /// Suffix appended to the task prompt of every fan-out participant
    pub const PARTICIPANT_SUFFIX: &str = "\n\nProvide a thorough and complete analysis.";

    /// Agent index reserved for the synthesis pass
    pub const SYNTHESIS_INDEX: i32 = -1;

    /// Registry timeout for one `agent` tool call (fan-out plus synthesis)
    pub const AGENT_TOOL_TIMEOUT_SECS: u64 = 3_600;
}

pub mod tools {
    /// Default per-tool execution timeout (2 minutes)
    pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 120;

    /// Upper bound for a caller-supplied shell timeout
    pub const MAX_BASH_TIMEOUT_SECS: u64 = 600;

    /// Exit code reported when a shell command times out
    pub const TIMEOUT_EXIT_CODE: i32 = 124;

    /// Shell output is cut to this many lines (head and tail halves kept)
    pub const MAX_BASH_OUTPUT_LINES: usize = 1_000;

    /// Tool output re-injected into the transcript is cut at this many chars
    pub const MAX_TOOL_OUTPUT_CHARS: usize = 30_000;

    /// Text files larger than this need offset/limit to be read
    pub const MAX_READ_BYTES: usize = 256 * 1024;

    /// Numbered content returned by one `read` call stops at this many chars,
    /// leaving room under `MAX_TOOL_OUTPUT_CHARS` for the envelope
    pub const MAX_READ_OUTPUT_CHARS: usize = 25_000;

    /// Lines of context around an edit in the preview snippet
    pub const SNIPPET_CONTEXT_LINES: usize = 4;

    /// Numbered lines shown after overwriting an existing file
    pub const WRITE_PREVIEW_LINES: usize = 100;

    /// Cap on glob/grep result lists
    pub const MAX_SEARCH_RESULTS: usize = 100;

    /// Bytes sniffed for a NUL to classify a file as binary
    pub const BINARY_SNIFF_BYTES: usize = 8_192;
}

pub mod paths {
    /// Global config directory name under $HOME
    pub const CONFIG_DIR_NAME: &str = ".quill";

    /// Project-local agent definitions directory, relative to the project root
    pub const PROJECT_AGENTS_DIR: &str = ".quill/agents";
}
