//! Command-line interface definition using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Relay - coordinate conversations between AI chat agents
#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to state directory
    #[arg(short, long, env = "RELAY_STATE_DIR")]
    pub state_dir: Option<String>,

    /// Agents to coordinate, comma separated (default: all built-in agents)
    #[arg(short, long, value_delimiter = ',')]
    pub agents: Vec<String>,

    /// Prefix of the tmux sessions hosting agents
    #[arg(long, env = "RELAY_SESSION_PREFIX", default_value = "relay-")]
    pub session_prefix: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start interactive REPL mode
    Repl,

    /// Run one command line (message, @mentions or /command) and exit
    Send {
        /// Command line to run
        #[arg(required = true)]
        message: String,

        /// Wait for the targeted agents' replies and print them
        #[arg(short, long)]
        wait: bool,
    },

    /// List configured agents and their connectivity
    Agents {
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Cli {
    /// Returns the state directory path, using default if not specified.
    pub fn state_dir(&self) -> PathBuf {
        match &self.state_dir {
            Some(dir) => PathBuf::from(shellexpand::tilde(dir).into_owned()),
            None => dirs::home_dir()
                .map(|h| h.join(".ai-relay"))
                .unwrap_or_else(|| PathBuf::from(".ai-relay")),
        }
    }

    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
