use async_trait::async_trait;
use google_cloud_secretmanager_v1::client::SecretManagerService;
use tracing::debug;

use crate::config::{GcpProvider, SecretRef, expand_tilde};
use crate::error::{DenvError, Result};
use crate::secrets::client::SecretClient;
use crate::secrets::property::select_property;

/// The only GCP service denv reads secrets from.
pub const SECRET_MANAGER: &str = "SecretManager";

const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Expand a leading `~` in `GOOGLE_APPLICATION_CREDENTIALS`, which the GCP
/// SDK reads verbatim.
///
/// This writes the process environment, so call it before any other thread
/// is started (the binary does so before building its runtime).
pub fn expand_credentials_env() {
    if let Some(expanded) = std::env::var(CREDENTIALS_ENV)
        .ok()
        .and_then(|path| expanded_credentials_path(&path))
    {
        // SAFETY: the caller guarantees the process is still single-threaded.
        unsafe {
            std::env::set_var(CREDENTIALS_ENV, expanded);
        }
    }
}

/// The expanded path when `path` starts with `~`, otherwise `None`.
fn expanded_credentials_path(path: &str) -> Option<String> {
    (path == "~" || path.starts_with("~/")).then(|| expand_tilde(path).display().to_string())
}

pub struct GcpSecretManager {
    client: SecretManagerService,
    project_id: String,
    location: Option<String>,
    id: String,
}

impl GcpSecretManager {
    pub fn new(
        client: SecretManagerService,
        project_id: String,
        location: Option<String>,
        id: String,
    ) -> Self {
        Self {
            client,
            project_id,
            location,
            id,
        }
    }

    /// Build a client using Application Default Credentials. A configured
    /// location switches to that region's endpoint.
    pub async fn connect(config: &GcpProvider) -> Result<Self> {
        let service = config.service.as_deref().unwrap_or(SECRET_MANAGER);
        if !service.eq_ignore_ascii_case(SECRET_MANAGER) {
            return Err(DenvError::UnsupportedService {
                provider: config.id.clone(),
                service: service.to_string(),
            });
        }

        if config.project.is_empty() {
            return Err(DenvError::init(
                &config.id,
                "GCP provider requires a 'project' with the GCP project ID",
            ));
        }

        // Already installed is fine.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let mut builder = SecretManagerService::builder();
        if let Some(location) = config.location.as_deref().filter(|l| !l.is_empty()) {
            builder = builder.with_endpoint(regional_endpoint(location));
        }

        let client = builder.build().await.map_err(|e| {
            let mut msg = format!("Failed to initialize GCP client: {}", e);
            if std::env::var("GOOGLE_APPLICATION_CREDENTIALS").is_err() {
                msg.push_str(
                    "\n  Hint: Set GOOGLE_APPLICATION_CREDENTIALS to a service account key JSON file,\n  \
                     or run 'gcloud auth application-default login'",
                );
            }
            DenvError::init(&config.id, msg)
        })?;

        debug!(provider = %config.id, project = %config.project, "GCP Secret Manager client ready");

        Ok(Self::new(
            client,
            config.project.clone(),
            config.location.clone().filter(|l| !l.is_empty()),
            config.id.clone(),
        ))
    }

    /// Resource name of the latest version of a secret.
    fn version_name(&self, name: &str) -> String {
        latest_version_name(&self.project_id, self.location.as_deref(), name)
    }
}

fn regional_endpoint(location: &str) -> String {
    format!("https://secretmanager.{}.rep.googleapis.com", location)
}

/// `projects/{p}/secrets/{s}/versions/latest`, or the regional
/// `projects/{p}/locations/{l}/secrets/{s}/versions/latest`.
fn latest_version_name(project_id: &str, location: Option<&str>, name: &str) -> String {
    match location {
        Some(location) => format!(
            "projects/{}/locations/{}/secrets/{}/versions/latest",
            project_id, location, name
        ),
        None => format!("projects/{}/secrets/{}/versions/latest", project_id, name),
    }
}

#[async_trait]
impl SecretClient for GcpSecretManager {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> &str {
        "gcp"
    }

    async fn get_secret(&self, reference: &SecretRef) -> Result<Vec<u8>> {
        let version_name = self.version_name(&reference.key);
        let resp = self
            .client
            .access_secret_version()
            .set_name(&version_name)
            .send()
            .await
            .map_err(|e| DenvError::gcp(&self.id, &reference.key, e))?;

        let payload = resp
            .payload
            .ok_or_else(|| DenvError::unavailable(&self.id, "Secret version has no payload"))?;

        select_property(payload.data.to_vec(), reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_resource_name() {
        assert_eq!(
            latest_version_name("dummy-project", None, "my-secret"),
            "projects/dummy-project/secrets/my-secret/versions/latest"
        );
    }

    #[test]
    fn test_regional_resource_name_and_endpoint() {
        assert_eq!(
            latest_version_name("dummy-project", Some("us-east1"), "my-secret"),
            "projects/dummy-project/locations/us-east1/secrets/my-secret/versions/latest"
        );
        assert_eq!(
            regional_endpoint("us-east1"),
            "https://secretmanager.us-east1.rep.googleapis.com"
        );
    }

    #[test]
    fn test_credentials_path_expansion() {
        assert_eq!(expanded_credentials_path("/etc/gcp.json"), None);
        assert_eq!(expanded_credentials_path("~other/gcp.json"), None);

        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expanded_credentials_path("~/gcp.json"),
                Some(home.join("gcp.json").display().to_string())
            );
        }
    }

    #[tokio::test]
    async fn test_unsupported_service() {
        let config = GcpProvider {
            id: "gcp".to_string(),
            service: Some("Storage".to_string()),
            project: "p".to_string(),
            location: None,
        };
        assert!(matches!(
            GcpSecretManager::connect(&config).await,
            Err(DenvError::UnsupportedService { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_project_fails_init() {
        let config = GcpProvider {
            id: "gcp".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            GcpSecretManager::connect(&config).await,
            Err(DenvError::ProviderInitFailed { .. })
        ));
    }
}
