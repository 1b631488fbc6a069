//! 1Password backend. The `op` CLI is the default; service accounts go
//! through the SDK core library.

pub mod cli;
mod ffi;
pub mod sdk;

use std::sync::Arc;

pub use cli::{OnePasswordCliSecretManager, OpExecutor, OpFailure};
pub use sdk::OnePasswordSdkSecretManager;

use crate::config::{OnePasswordAuthMethod, OnePasswordProvider};
use crate::error::Result;
use crate::secrets::client::SecretClient;

/// Build the client matching the provider's `auth` setting.
pub async fn connect(config: &OnePasswordProvider) -> Result<Arc<dyn SecretClient>> {
    match config.auth_method() {
        OnePasswordAuthMethod::Cli => Ok(Arc::new(OnePasswordCliSecretManager::connect(
            config.id.clone(),
            config.account.clone(),
        )?)),
        OnePasswordAuthMethod::ServiceAccount => Ok(Arc::new(
            OnePasswordSdkSecretManager::connect(config.id.clone(), config.token_env.as_deref())
                .await?,
        )),
    }
}
