//! Gen command - resolve the declared environment and write it out.

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::connect_providers;
use crate::config::Config;
use crate::dotenv;
use crate::error::Result;
use crate::resolve::{ResolveOptions, resolve_envs};

/// Handle the gen command. Nothing is written unless every variable resolves.
pub async fn handle_gen(
    config: &Config,
    output: &Path,
    options: ResolveOptions,
    cancel: &CancellationToken,
) -> Result<()> {
    let registry = connect_providers(config, cancel).await?;
    let env = resolve_envs(&config.envs, &registry, options, cancel).await?;

    dotenv::write_file(output, &env)?;
    info!(path = %output.display(), count = env.len(), "generated dotenv file");
    println!("Wrote {} variables to {}", env.len(), output.display());
    Ok(())
}
