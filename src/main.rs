//! Taskforest - AI-assisted hierarchical task manager
//!
//! CLI entry point.

use std::fs;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use taskforest::cli::{get_log_path, Cli, Command, OutputFormat};
use taskforest::config::Config;
use taskforest::persist::{snapshot, TaskFile};
use taskforest::repl;

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Setup tracing subscriber - write to log file, not stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!(
        "Taskforest loaded config: model={}, tasks-file={}",
        config.llm.model,
        config.storage.tasks_file.display()
    );

    match cli.command {
        Some(Command::Show { format }) => cmd_show(&config, format),
        Some(Command::Add { text }) => cmd_add(&config, &text),
        Some(Command::Repl) | None => repl::run_interactive(&config).await,
    }
}

/// Print the task tree once
fn cmd_show(config: &Config, format: OutputFormat) -> Result<()> {
    let file = TaskFile::new(&config.storage.tasks_file);
    let store = file.load().context("Failed to load tasks file")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&snapshot(&store))?);
        }
        OutputFormat::Text => {
            if store.is_empty() {
                println!("No tasks yet. Add one with: tsk add <text>");
                return Ok(());
            }
            for row in store.visible_rows() {
                let checkbox = if row.completed { "[x]" } else { "[ ]" };
                let marker = if row.has_children && !row.expanded { " …" } else { "" };
                println!("{}{} {}{}", "  ".repeat(row.depth), checkbox, row.text, marker);
            }
        }
    }

    Ok(())
}

/// Append a new root task
///
/// Works directly on the tasks file; no engine and no service access needed.
fn cmd_add(config: &Config, text: &str) -> Result<()> {
    let file = TaskFile::new(&config.storage.tasks_file);
    let mut store = file.load().context("Failed to load tasks file")?;

    store.add_root(text)?;
    file.save(&store).context("Failed to save tasks file")?;

    println!("Added: {}", text);
    Ok(())
}
