//! Quill - a terminal coding assistant
//!
//! - `quill "fix the failing test"` runs one query and prints the answer
//! - `quill` with no query starts an interactive session
//! - the `agent` tool fans work out to parallel sub-agents

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use quill_core::config::QuillConfig;
use quill_core::paths;

mod app;
mod settings;

use settings::{Overrides, Settings};

/// Quill - AI Coding Assistant
#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "A terminal coding assistant with parallel sub-agents", long_about = None)]
struct Cli {
    /// Query to run; omit for an interactive session
    query: Vec<String>,

    /// Model name (overrides OPENAI_MODEL and the config file)
    #[arg(short, long)]
    model: Option<String>,

    /// Number of sub-agents the agent tool fans out to
    #[arg(long)]
    parallel_agents: Option<usize>,

    /// Iteration bound for the main conversation
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Working directory for tools
    #[arg(long)]
    cwd: Option<PathBuf>,
}

/// Log to a file so log lines never interleave with the conversation
fn init_logging() -> Result<()> {
    let log_dir = paths::logs_dir();
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Failed to create log directory: {}", e);
    }

    #[cfg(unix)]
    let null_device = "/dev/null";
    #[cfg(windows)]
    let null_device = "NUL";

    let log_file = match std::fs::File::create(log_dir.join("quill.log")) {
        Ok(file) => file,
        Err(e) => {
            eprintln!(
                "Failed to create log file: {}, falling back to null device",
                e
            );
            std::fs::File::create(null_device)?
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let file = QuillConfig::load(&paths::config_file())?;
    let settings = Settings::resolve(
        &file,
        Overrides {
            model: cli.model,
            parallel_agents: cli.parallel_agents,
            max_iterations: cli.max_iterations,
            cwd: cli.cwd,
        },
    )?;

    if settings.client.api_key.is_none() {
        tracing::warn!("No API key configured; requests will be sent unauthenticated");
    }
    tracing::info!(
        model = %settings.client.model,
        parallel_agents = settings.parallel_agents,
        working_dir = %settings.working_dir.display(),
        "Starting Quill"
    );

    let mut app = app::App::new(settings).await?;

    if cli.query.is_empty() {
        app.interactive().await?;
    } else {
        let query = cli.query.join(" ");
        let outcome = app.run_query(&query).await?;
        println!("{}", outcome.content);
    }

    Ok(())
}
