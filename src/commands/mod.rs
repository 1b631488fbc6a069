//! Command handlers for the denv CLI.

mod generate;
mod init;
mod outdated;
mod run;

pub use generate::handle_gen;
pub use init::handle_init;
pub use outdated::{Drift, handle_outdated};
pub use run::handle_run;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{DenvError, Result};
use crate::secrets::ProviderRegistry;

/// Build every configured provider, giving up when `cancel` fires.
async fn connect_providers(config: &Config, cancel: &CancellationToken) -> Result<ProviderRegistry> {
    tokio::select! {
        _ = cancel.cancelled() => Err(DenvError::Cancelled),
        registry = ProviderRegistry::from_specs(&config.providers) => registry,
    }
}
