//! Command-line interface for skywatch.
//!
//! This module provides the CLI structure and command handlers for the
//! `skywatch` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, FetchCommand, RecentCommand, StatusCommand};

/// skywatch - Watch a region of sky and score delay risk
///
/// Polls live flight-state data for a configured region, persists every
/// observation, and records a delay probability for each flight using a
/// locally trained classifier.
#[derive(Debug, Parser)]
#[command(name = "skywatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll continuously, scoring and storing every cycle
    Watch,

    /// Run a single fetch, score, and store cycle
    Fetch(FetchCommand),

    /// Show recently observed flights
    Recent(RecentCommand),

    /// Retrain the delay model and persist it
    Train,

    /// Show database and model status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "skywatch");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_quiet() {
        let cli = Cli {
            config: None,
            verbose: 0,
            quiet: true,
            command: Command::Watch,
        };
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_normal() {
        let cli = Cli {
            config: None,
            verbose: 0,
            quiet: false,
            command: Command::Watch,
        };
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Normal);
    }

    #[test]
    fn test_verbosity_verbose() {
        let cli = Cli {
            config: None,
            verbose: 1,
            quiet: false,
            command: Command::Watch,
        };
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Verbose);
    }

    #[test]
    fn test_verbosity_trace() {
        let cli = Cli {
            config: None,
            verbose: 3,
            quiet: false,
            command: Command::Watch,
        };
        assert_eq!(cli.verbosity(), crate::logging::Verbosity::Trace);
    }

    #[test]
    fn test_parse_watch() {
        let cli = Cli::try_parse_from(["skywatch", "watch"]).unwrap();
        assert!(matches!(cli.command, Command::Watch));
    }

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::try_parse_from(["skywatch", "fetch", "--json"]).unwrap();
        match cli.command {
            Command::Fetch(cmd) => assert!(cmd.json),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_recent_with_limit() {
        let cli = Cli::try_parse_from(["skywatch", "recent", "--limit", "5"]).unwrap();
        match cli.command {
            Command::Recent(cmd) => {
                assert_eq!(cmd.limit, 5);
                assert!(!cmd.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_recent_default_limit() {
        let cli = Cli::try_parse_from(["skywatch", "recent"]).unwrap();
        match cli.command {
            Command::Recent(cmd) => assert_eq!(cmd.limit, 20),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_train() {
        let cli = Cli::try_parse_from(["skywatch", "train"]).unwrap();
        assert!(matches!(cli.command, Command::Train));
    }

    #[test]
    fn test_parse_status() {
        let cli = Cli::try_parse_from(["skywatch", "status"]).unwrap();
        assert!(matches!(cli.command, Command::Status(_)));
    }

    #[test]
    fn test_parse_config_show() {
        let cli = Cli::try_parse_from(["skywatch", "config", "show"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Show { .. })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = Cli::try_parse_from(["skywatch", "-c", "/custom/config.toml", "watch"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_with_quiet() {
        let cli = Cli::try_parse_from(["skywatch", "-q", "watch"]).unwrap();
        assert!(cli.quiet);
    }
}
