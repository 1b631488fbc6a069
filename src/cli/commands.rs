//! Command and subcommand definitions.

use clap::Subcommand;
use std::path::PathBuf;

use super::args::ResolveArgs;

/// Top-level commands available in denv.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve every declared variable and write a dotenv file
    Gen {
        /// Output file
        #[arg(short, long, default_value = ".env")]
        output: PathBuf,

        #[command(flatten)]
        resolve: ResolveArgs,
    },
    /// Show how a dotenv file differs from the declared environment
    /// (exit 0 in sync, 1 outdated, 2 error)
    Outdated {
        /// Dotenv file to check
        #[arg(long, default_value = ".env")]
        envfile: PathBuf,

        /// Compare variable names only; no secrets are fetched
        #[arg(long)]
        name_only: bool,

        #[command(flatten)]
        resolve: ResolveArgs,
    },
    /// Run a command with the variables of a dotenv file
    Run {
        /// Dotenv file to load
        #[arg(short, long, default_value = ".env")]
        envfile: PathBuf,

        /// Command and its arguments
        #[arg(
            trailing_var_arg = true,
            allow_hyphen_values = true,
            required = true,
            num_args = 1..,
            value_name = "COMMAND"
        )]
        command: Vec<String>,
    },
    /// Write a starter config file
    Init {
        /// Where to write the config (default: ./denv.kdl)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Replace an existing file
        #[arg(long)]
        overwrite: bool,
    },
}
