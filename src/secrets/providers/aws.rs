use async_trait::async_trait;
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_secretsmanager::{Client, config::Region};
use tracing::debug;

use crate::config::{AwsProvider, SecretRef, expand_tilde};
use crate::error::{DenvError, Result};
use crate::secrets::client::SecretClient;
use crate::secrets::property::select_property;

/// The only AWS service denv reads secrets from.
pub const SECRETS_MANAGER: &str = "SecretsManager";

const VERSION_STAGE: &str = "AWSCURRENT";

const DEFAULT_REGION: &str = "us-east-1";

pub struct AwsSecretManager {
    client: Client,
    id: String,
}

impl AwsSecretManager {
    pub fn new(client: Client, id: String) -> Self {
        Self { client, id }
    }

    /// Build a client from config, resolving region and credentials up front.
    pub async fn connect(config: &AwsProvider) -> Result<Self> {
        let service = config.service.as_deref().unwrap_or(SECRETS_MANAGER);
        if !service.eq_ignore_ascii_case(SECRETS_MANAGER) {
            return Err(DenvError::UnsupportedService {
                provider: config.id.clone(),
                service: service.to_string(),
            });
        }

        // Without an explicit region the loader's own chain runs, which reads
        // the configured profile and files.
        let mut config_loader = aws_config::from_env();
        if let Some(region) = &config.region {
            config_loader = config_loader.region(Region::new(region.clone()));
        }

        let profile_files = profile_files(config);
        if let Some(files) = &profile_files {
            config_loader = config_loader.profile_files(files.clone());
        }

        // A named profile bypasses AWS_ACCESS_KEY_ID and friends so the
        // profile's credentials are the ones actually used.
        if let Some(profile_name) = &config.profile {
            let mut builder = ProfileFileCredentialsProvider::builder().profile_name(profile_name);
            if let Some(files) = profile_files {
                builder = builder.profile_files(files);
            }
            config_loader = config_loader
                .profile_name(profile_name)
                .credentials_provider(builder.build());
        }

        if let Some(endpoint) = &config.endpoint {
            config_loader = config_loader.endpoint_url(endpoint);
        }

        let mut shared_config = config_loader.load().await;
        if shared_config.region().is_none() {
            shared_config = shared_config
                .to_builder()
                .region(Region::new(DEFAULT_REGION))
                .build();
        }

        let credentials = shared_config
            .credentials_provider()
            .ok_or_else(|| DenvError::init(&config.id, "no AWS credentials provider available"))?;
        credentials
            .provide_credentials()
            .await
            .map_err(|e| DenvError::init(&config.id, format!("failed to load AWS credentials: {}", e)))?;

        debug!(
            provider = %config.id,
            region = ?shared_config.region().map(|r| r.to_string()),
            "AWS Secrets Manager client ready"
        );

        Ok(Self::new(Client::new(&shared_config), config.id.clone()))
    }
}

/// Custom shared config/credentials files, if any were configured.
fn profile_files(config: &AwsProvider) -> Option<ProfileFiles> {
    let config_files = config.shared_config_files.as_deref().unwrap_or_default();
    let credentials_files = config.shared_credentials_files.as_deref().unwrap_or_default();

    if config_files.is_empty() && credentials_files.is_empty() {
        return None;
    }

    let mut builder = ProfileFiles::builder();
    for path in config_files {
        builder = builder.with_file(ProfileFileKind::Config, expand_tilde(path));
    }
    for path in credentials_files {
        builder = builder.with_file(ProfileFileKind::Credentials, expand_tilde(path));
    }
    Some(builder.build())
}

#[async_trait]
impl SecretClient for AwsSecretManager {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "aws"
    }

    async fn get_secret(&self, reference: &SecretRef) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get_secret_value()
            .secret_id(&reference.key)
            .version_stage(VERSION_STAGE)
            .send()
            .await
            .map_err(|e| {
                DenvError::aws(
                    &self.id,
                    &reference.key,
                    aws_sdk_secretsmanager::error::DisplayErrorContext(e),
                )
            })?;

        let payload = if let Some(value) = resp.secret_string() {
            value.as_bytes().to_vec()
        } else if let Some(blob) = resp.secret_binary() {
            blob.as_ref().to_vec()
        } else {
            return Err(DenvError::unavailable(
                &self.id,
                format!("secret '{}' has no value", reference.key),
            ));
        };

        select_property(payload, reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_service_fails_before_any_aws_call() {
        let config = AwsProvider {
            id: "aws-dev".to_string(),
            service: Some("ParameterStore".to_string()),
            ..Default::default()
        };

        match AwsSecretManager::connect(&config).await {
            Err(DenvError::UnsupportedService { provider, service }) => {
                assert_eq!(provider, "aws-dev");
                assert_eq!(service, "ParameterStore");
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected UnsupportedService"),
        }
    }

    fn region_env_is_set() -> bool {
        std::env::var_os("AWS_REGION").is_some() || std::env::var_os("AWS_DEFAULT_REGION").is_some()
    }

    fn profile_config(dir: &std::path::Path, region: Option<&str>) -> AwsProvider {
        let config_file = dir.join("config");
        let credentials_file = dir.join("credentials");
        std::fs::write(&config_file, "[profile dev]\nregion = eu-west-2\n").unwrap();
        std::fs::write(
            &credentials_file,
            "[dev]\naws_access_key_id = AKIDEXAMPLE\naws_secret_access_key = wJalrXUtnFEMI\n",
        )
        .unwrap();

        AwsProvider {
            id: "aws-dev".to_string(),
            profile: Some("dev".to_string()),
            region: region.map(str::to_string),
            shared_config_files: Some(vec![config_file.display().to_string()]),
            shared_credentials_files: Some(vec![credentials_file.display().to_string()]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_region_comes_from_configured_profile() {
        if region_env_is_set() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let config = profile_config(dir.path(), None);

        let client = AwsSecretManager::connect(&config).await.unwrap();
        assert_eq!(
            client.client.config().region().map(|r| r.as_ref()),
            Some("eu-west-2")
        );
    }

    #[tokio::test]
    async fn test_explicit_region_wins_over_profile() {
        let dir = tempfile::tempdir().unwrap();
        let config = profile_config(dir.path(), Some("ap-south-1"));

        let client = AwsSecretManager::connect(&config).await.unwrap();
        assert_eq!(
            client.client.config().region().map(|r| r.as_ref()),
            Some("ap-south-1")
        );
    }

    #[test]
    fn test_profile_files_only_when_configured() {
        let config = AwsProvider {
            id: "aws".to_string(),
            ..Default::default()
        };
        assert!(profile_files(&config).is_none());

        let config = AwsProvider {
            id: "aws".to_string(),
            shared_credentials_files: Some(vec!["/tmp/creds".to_string()]),
            ..Default::default()
        };
        assert!(profile_files(&config).is_some());
    }
}
