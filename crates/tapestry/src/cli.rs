//! Command-line interface for the tapestry binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Mirror an external chat platform into PostgreSQL and fan changes out to
/// signed webhooks.
#[derive(Debug, Parser)]
#[command(name = "tapestry", version, about)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "tapestry.toml")]
    pub config: PathBuf,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run pending database migrations.
    Migrate,

    /// Mirror a server's history through the platform's read API.
    Backfill {
        /// External server id to backfill.
        #[arg(short, long)]
        server: String,

        /// Only mirror messages created at or after this RFC 3339 timestamp.
        #[arg(long)]
        since: Option<String>,
    },

    /// Show recent sync runs.
    Status {
        /// Restrict to one server.
        #[arg(short, long)]
        server: Option<String>,

        /// Number of runs to show.
        #[arg(short, long, default_value_t = 10)]
        limit: i64,
    },

    /// Replay a dead-lettered notification once.
    Replay {
        /// Dead letter id.
        id: i32,

        /// Operator name stamped on the dead letter.
        #[arg(long, default_value = "cli")]
        actor: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backfill_with_cutoff() {
        let cli = Cli::parse_from([
            "tapestry",
            "backfill",
            "--server",
            "S1",
            "--since",
            "2026-01-01T00:00:00Z",
        ]);
        match cli.command {
            Commands::Backfill { server, since } => {
                assert_eq!(server, "S1");
                assert_eq!(since.as_deref(), Some("2026-01-01T00:00:00Z"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn replay_defaults_actor() {
        let cli = Cli::parse_from(["tapestry", "replay", "42"]);
        match cli.command {
            Commands::Replay { id, actor } => {
                assert_eq!(id, 42);
                assert_eq!(actor, "cli");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
