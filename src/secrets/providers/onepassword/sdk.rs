//! 1Password access with a service account token through the SDK core.

use async_trait::async_trait;
use tracing::debug;

use super::ffi::{OnePasswordSdkClient, SharedSdkClient};
use crate::config::SecretRef;
use crate::error::{DenvError, Result};
use crate::secrets::client::SecretClient;
use crate::secrets::property::select_property;

/// Environment variable read when the provider does not name one.
pub const DEFAULT_TOKEN_ENV: &str = "OP_SERVICE_ACCOUNT_TOKEN";

pub struct OnePasswordSdkSecretManager {
    sdk_client: SharedSdkClient,
    id: String,
}

impl OnePasswordSdkSecretManager {
    /// Authenticate with the token found in `token_env` (or the default
    /// variable). Runs the blocking SDK initialization off the async runtime.
    pub async fn connect(id: String, token_env: Option<&str>) -> Result<Self> {
        let token = read_token(&id, token_env)?;

        let init_id = id.clone();
        let client = tokio::task::spawn_blocking(move || OnePasswordSdkClient::connect(&token))
            .await
            .map_err(|e| DenvError::init(&init_id, format!("SDK init task failed: {}", e)))?
            .map_err(|e| DenvError::init(&init_id, e.to_string()))?;

        debug!(provider = %id, "1Password SDK client ready");

        Ok(Self {
            sdk_client: SharedSdkClient::new(client),
            id,
        })
    }
}

/// Read a non-empty service account token from the environment.
fn read_token(id: &str, token_env: Option<&str>) -> Result<String> {
    let var = token_env.filter(|v| !v.is_empty()).unwrap_or(DEFAULT_TOKEN_ENV);
    match std::env::var(var) {
        Ok(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(DenvError::init(
            id,
            format!("service account token not set: export {}", var),
        )),
    }
}

#[async_trait]
impl SecretClient for OnePasswordSdkSecretManager {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "onepassword"
    }

    async fn get_secret(&self, reference: &SecretRef) -> Result<Vec<u8>> {
        let value = self
            .sdk_client
            .resolve_secret(&reference.key)
            .await
            .map_err(|e| {
                let msg = e.to_string();
                let lower = msg.to_lowercase();
                if lower.contains("not found") || lower.contains("no item") {
                    DenvError::not_found(&self.id, &reference.key)
                } else {
                    DenvError::unavailable(&self.id, msg)
                }
            })?;

        select_property(value.into_bytes(), reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_env_fails_init() {
        let err = read_token("op-ci", Some("DENV_TEST_TOKEN_THAT_IS_NEVER_SET")).unwrap_err();
        match err {
            DenvError::ProviderInitFailed { provider, message } => {
                assert_eq!(provider, "op-ci");
                assert!(message.contains("DENV_TEST_TOKEN_THAT_IS_NEVER_SET"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connect_without_token_never_loads_library() {
        let result =
            OnePasswordSdkSecretManager::connect("op-ci".to_string(), Some("DENV_TEST_EMPTY_TOKEN"))
                .await;
        assert!(matches!(result, Err(DenvError::ProviderInitFailed { .. })));
    }
}
