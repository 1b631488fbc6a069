//! CLI argument parsing structures.

use clap::builder::TypedValueParser;
use clap::{Args, Parser};
use std::path::PathBuf;
use std::time::Duration;

use super::commands::Commands;
use crate::config::DEFAULT_CONFIG_FILE;
use crate::resolve::{DEFAULT_CONCURRENCY, ResolveOptions};

/// Main CLI structure for denv.
#[derive(Parser, Debug)]
#[command(name = "denv", version)]
#[command(about = "Generate .env files from secret managers", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Global configuration arguments available to all commands.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Path to the denv config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Options for commands that fetch secrets.
#[derive(Debug, Clone, Args)]
pub struct ResolveArgs {
    /// Maximum number of secrets fetched at once
    #[arg(
        long,
        default_value_t = DEFAULT_CONCURRENCY,
        value_parser = clap::value_parser!(u64).range(1..).map(|n| n as usize)
    )]
    pub concurrency: usize,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl ResolveArgs {
    pub fn options(&self) -> ResolveOptions {
        ResolveOptions::with_concurrency(self.concurrency)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["denv", "gen"]).unwrap();
        assert_eq!(cli.config.config, PathBuf::from(DEFAULT_CONFIG_FILE));
        assert_eq!(cli.config.verbose, 0);
        match cli.command {
            Commands::Gen { output, resolve } => {
                assert_eq!(output, PathBuf::from(".env"));
                assert_eq!(resolve.concurrency, DEFAULT_CONCURRENCY);
                assert!(resolve.timeout().is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_outdated_flags() {
        let cli = Cli::try_parse_from([
            "denv",
            "-vv",
            "--config",
            "other.kdl",
            "outdated",
            "--envfile",
            "prod.env",
            "--name-only",
            "--concurrency",
            "2",
            "--timeout",
            "30",
        ])
        .unwrap();
        assert_eq!(cli.config.verbose, 2);
        assert_eq!(cli.config.config, PathBuf::from("other.kdl"));
        match cli.command {
            Commands::Outdated {
                envfile,
                name_only,
                resolve,
            } => {
                assert_eq!(envfile, PathBuf::from("prod.env"));
                assert!(name_only);
                assert_eq!(resolve.options().concurrency, 2);
                assert_eq!(resolve.timeout(), Some(Duration::from_secs(30)));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(Cli::try_parse_from(["denv", "gen", "--concurrency", "0"]).is_err());
    }

    #[test]
    fn test_run_collects_trailing_command() {
        let cli =
            Cli::try_parse_from(["denv", "run", "-e", "x.env", "--", "ls", "-la", "--color"])
                .unwrap();
        match cli.command {
            Commands::Run { envfile, command } => {
                assert_eq!(envfile, PathBuf::from("x.env"));
                assert_eq!(command, vec!["ls", "-la", "--color"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_run_requires_command() {
        assert!(Cli::try_parse_from(["denv", "run"]).is_err());
    }
}
