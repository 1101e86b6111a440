//! REPL session management

use std::sync::Arc;

use colored::Colorize;
use eyre::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::decompose::{DecomposeClient, HttpDecomposer};
use crate::engine::{EngineError, EngineEvent, TaskEngine, TaskRow};

/// Run the interactive session against the configured tasks file
pub async fn run_interactive(config: &Config) -> Result<()> {
    config.validate()?;

    let client: Arc<dyn DecomposeClient> = Arc::new(HttpDecomposer::from_config(&config.llm)?);
    let engine = TaskEngine::spawn(&config.storage.tasks_file, client)?;

    let mut session = ReplSession::new(engine);
    session.run().await
}

/// Interactive session over one engine handle
pub struct ReplSession {
    engine: TaskEngine,
    events: broadcast::Receiver<EngineEvent>,
    /// Rows as of the last render; row numbers the user types index into this
    rows: Vec<TaskRow>,
}

impl ReplSession {
    /// Create a new session
    pub fn new(engine: TaskEngine) -> Self {
        let events = engine.subscribe_events();
        Self {
            engine,
            events,
            rows: Vec::new(),
        }
    }

    /// Run the session main loop
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();
        self.render().await?;

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            self.drain_events();

            let readline = rl.readline(&format!("{} ", ">".bright_green()));
            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        self.render().await?;
                        continue;
                    }

                    let _ = rl.add_history_entry(input);

                    match self.handle_command(input).await {
                        Ok(CommandResult::Continue) => {}
                        Ok(CommandResult::Quit) => break,
                        Err(e) => println!("{} {}", "error:".red(), e),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    println!("{} {}", "error:".red(), e);
                    break;
                }
            }
        }

        self.engine.shutdown().await.ok();
        println!("Bye.");
        Ok(())
    }

    async fn handle_command(&mut self, input: &str) -> Result<CommandResult> {
        let (command, rest) = match input.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (input, ""),
        };

        match command {
            "quit" | "exit" | "q" => return Ok(CommandResult::Quit),
            "help" | "?" => self.print_help(),
            "list" | "ls" => {}
            "add" => {
                if rest.is_empty() {
                    println!("usage: add <text>");
                } else {
                    self.engine.add_root(rest).await?;
                }
            }
            "toggle" | "check" | "x" => {
                let id = self.row_id(rest)?;
                self.engine.toggle_completed(id).await?;
            }
            "expand" | "fold" => {
                let id = self.row_id(rest)?;
                self.engine.toggle_expanded(id).await?;
            }
            "edit" => {
                let (index, text) = match rest.split_once(char::is_whitespace) {
                    Some((i, t)) if !t.trim().is_empty() => (i, t.trim()),
                    _ => {
                        println!("usage: edit <row> <text>");
                        return Ok(CommandResult::Continue);
                    }
                };
                let id = self.row_id(index)?;
                self.engine.set_text(id, text).await?;
            }
            "decompose" | "split" => {
                let id = self.row_id(rest)?;
                match self.engine.decompose(id).await {
                    Ok(()) => println!("{}", "decomposing…".yellow()),
                    Err(EngineError::DecomposeInFlight(_)) => {
                        println!("{}", "a decomposition is already running for that task".yellow());
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            "delete" | "rm" => {
                let id = self.row_id(rest)?;
                self.engine.delete(id).await?;
            }
            _ => {
                println!("unknown command: {} (try 'help')", command);
                return Ok(CommandResult::Continue);
            }
        }

        self.render().await?;
        Ok(CommandResult::Continue)
    }

    /// Resolve a 1-based row number from the last render
    fn row_id(&self, arg: &str) -> Result<crate::domain::TaskId> {
        let index: usize = arg
            .parse()
            .map_err(|_| eyre::eyre!("expected a row number, got '{}'", arg))?;
        self.rows
            .get(index.wrapping_sub(1))
            .map(|row| row.id)
            .ok_or_else(|| eyre::eyre!("no row {} (have {})", index, self.rows.len()))
    }

    /// Fetch and print the visible rows
    async fn render(&mut self) -> Result<()> {
        self.rows = self.engine.visible_rows().await?;

        if self.rows.is_empty() {
            println!("{}", "no tasks - 'add <text>' to create one".dimmed());
            return Ok(());
        }

        for (index, row) in self.rows.iter().enumerate() {
            let checkbox = if row.completed {
                "[x]".green().to_string()
            } else {
                "[ ]".to_string()
            };
            let text = if row.completed {
                row.text.dimmed().to_string()
            } else {
                row.text.clone()
            };
            let marker = if row.decomposing {
                format!(" {}", "(decomposing…)".yellow())
            } else if row.has_children && !row.expanded {
                " …".dimmed().to_string()
            } else {
                String::new()
            };
            println!(
                "{:>3} {}{} {}{}",
                index + 1,
                "  ".repeat(row.depth),
                checkbox,
                text,
                marker
            );
        }
        Ok(())
    }

    /// Print queued engine notices without blocking
    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                EngineEvent::DecomposeCompleted { subtasks, .. } => {
                    println!("{} {} subtasks", "decomposed into".green(), subtasks);
                }
                EngineEvent::DecomposeFailed { kind, message, .. } => {
                    println!("{} ({}) {}", "decomposition failed".red(), kind, message);
                }
                EngineEvent::SaveFailed { message } => {
                    println!("{} {}", "could not save tasks file:".red(), message);
                }
                EngineEvent::TreeChanged | EngineEvent::DecomposeStarted { .. } => {}
            }
        }
    }

    fn print_welcome(&self) {
        println!("{}", "taskforest".bold());
        println!("{}", "type 'help' for commands; Enter refreshes the list".dimmed());
    }

    fn print_help(&self) {
        println!("  add <text>        add a root task");
        println!("  toggle <row>      check/uncheck a task (cascades)");
        println!("  expand <row>      expand/collapse a task's subtasks");
        println!("  edit <row> <text> change a task's text");
        println!("  decompose <row>   split a task into AI-suggested subtasks");
        println!("  delete <row>      delete a task and its subtasks");
        println!("  list              re-print the tree (plain Enter works too)");
        println!("  quit              leave");
    }
}

enum CommandResult {
    Continue,
    Quit,
}
