//! CLI command definitions for the `chatkeep` binary.
//!
//! Uses clap derive macros for argument parsing. `serve` runs the web chat;
//! `sessions` and `history` read the message store directly.

pub mod session;

use clap::{Parser, Subcommand};

use chatkeep_types::error::ConfigError;

/// Browser chat with a hosted language model and persistent history.
#[derive(Parser)]
#[command(name = "chatkeep", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Message database connection string (e.g. `sqlite://chat.db?mode=rwc`).
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web chat server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// List stored chat sessions, newest first.
    #[command(alias = "ls")]
    Sessions,

    /// Print the stored history of a session.
    History {
        /// Session id (e.g. 20250131_142501).
        session_id: String,
    },
}

impl Cli {
    /// The tracing filter implied by `--verbose` / `--quiet`.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,chatkeep=debug",
            _ => "trace",
        }
    }

    /// The database connection string; absence is a fatal configuration error.
    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        let url = self
            .database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        if !url.starts_with("sqlite:") {
            return Err(ConfigError::Invalid(format!(
                "unsupported database URL '{url}': expected a sqlite: connection string"
            )));
        }
        Ok(url)
    }
}
