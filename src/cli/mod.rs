//! Command-line interface definitions.

mod args;
mod commands;

pub use args::{Cli, ConfigArgs, ResolveArgs};
pub use commands::Commands;
