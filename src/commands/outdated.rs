//! Outdated command - compare a dotenv file with the declared environment.

use std::path::Path;

use tokio_util::sync::CancellationToken;

use super::connect_providers;
use crate::config::Config;
use crate::diff::{Diff, compute_diff, compute_name_diff, render};
use crate::dotenv;
use crate::error::Result;
use crate::resolve::{ResolveOptions, resolve_envs};

/// Result of a drift check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drift {
    InSync,
    Outdated(Diff),
}

/// Handle the outdated command. Drift is reported through the return value,
/// not as an error; the rendered diff goes to stdout.
pub async fn handle_outdated(
    config: &Config,
    envfile: &Path,
    name_only: bool,
    options: ResolveOptions,
    cancel: &CancellationToken,
) -> Result<Drift> {
    let current = dotenv::read_file(envfile)?;

    let diff = if name_only {
        compute_name_diff(&current, config.envs.keys())
    } else {
        let registry = connect_providers(config, cancel).await?;
        let declared = resolve_envs(&config.envs, &registry, options, cancel).await?;
        compute_diff(&current, &declared, false)
    };

    if !diff.is_changed() {
        return Ok(Drift::InSync);
    }

    print!("{}", render(&diff));
    Ok(Drift::Outdated(diff))
}
