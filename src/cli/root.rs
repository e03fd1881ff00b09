use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::Config;
use crate::session::{SessionPersistence, SqliteStorage};
use super::commands::{
    DeleteCommand, FeedbackCommand, ListCommand, NewCommand, RenameCommand, SendCommand,
    ShareCommand, ShowCommand, SwitchCommand,
};

/// convo - manage chat sessions from the terminal
#[derive(Parser, Debug)]
#[command(
    name = "convo",
    version,
    about = "Manage chat sessions stored on this machine",
    long_about = r#"convo keeps a local set of chat sessions and the currently active one.
Every change goes through the session store and is saved after each command.

Examples:
  convo new --title "Trip plan"   # Start a session and make it active
  convo send "Where should we go?" # Append a message to the active session
  convo list                      # Show all sessions
  convo show --format markdown    # Print the active conversation"#
)]
pub struct Cli {
    /// Directory holding the session database
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List sessions
    List(ListCommand),
    /// Create a session and make it active
    New(NewCommand),
    /// Make another session active
    Switch(SwitchCommand),
    /// Append a message to a session
    Send(SendCommand),
    /// Change a session's title
    Rename(RenameCommand),
    /// Delete a session
    Delete(DeleteCommand),
    /// Print a session's messages
    Show(ShowCommand),
    /// Create a public share link for a session
    Share(ShareCommand),
    /// Send feedback about the active session
    Feedback(FeedbackCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        if self.debug {
            debug!("Debug logging enabled");
        }

        let config = Config::init(self.data_dir.clone()).await?;
        config.validate()?;
        debug!("Configuration initialized");

        let storage = SqliteStorage::open(config.database_path())
            .with_context(|| format!("Failed to open {}", config.database_path().display()))?;
        let mut persistence = SessionPersistence::with_key(storage, config.storage_key.clone());

        let outcome = persistence.load();
        for warning in &outcome.warnings {
            eprintln!("warning: {}", warning);
        }
        let mut store = outcome.store;

        let changed = match self.command {
            Commands::List(cmd) => cmd.execute(&store)?,
            Commands::New(cmd) => cmd.execute(&mut store)?,
            Commands::Switch(cmd) => cmd.execute(&mut store)?,
            Commands::Send(cmd) => cmd.execute(&mut store)?,
            Commands::Rename(cmd) => cmd.execute(&mut store)?,
            Commands::Delete(cmd) => cmd.execute(&mut store)?,
            Commands::Show(cmd) => cmd.execute(&store)?,
            Commands::Share(cmd) => cmd.execute(&store, &config).await?,
            Commands::Feedback(cmd) => cmd.execute(&store, &config).await?,
        };

        if changed {
            persistence.save(&store).context("Failed to save sessions")?;
            info!("Saved {} session(s)", store.len());
        }

        Ok(())
    }
}
