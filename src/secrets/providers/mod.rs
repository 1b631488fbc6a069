//! Backend construction and the provider registry.

mod aws;
mod gcp;
pub mod onepassword;

pub use aws::AwsSecretManager;
pub use gcp::{GcpSecretManager, expand_credentials_env};
pub use onepassword::{OnePasswordCliSecretManager, OnePasswordSdkSecretManager};

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::ProviderSpec;
use crate::error::{DenvError, Result};
use crate::secrets::client::SecretClient;

/// Construct the client for one provider declaration.
pub async fn build_client(spec: &ProviderSpec) -> Result<Arc<dyn SecretClient>> {
    match spec {
        ProviderSpec::Aws(config) => Ok(Arc::new(AwsSecretManager::connect(config).await?)),
        ProviderSpec::Gcp(config) => Ok(Arc::new(GcpSecretManager::connect(config).await?)),
        ProviderSpec::Onepassword(config) => onepassword::connect(config).await,
    }
}

/// Provider ID to client. Read-only once built; clients live for the run.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    clients: HashMap<String, Arc<dyn SecretClient>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one client per declaration. IDs are checked for collisions
    /// before any backend is contacted; the first construction failure aborts.
    pub async fn from_specs(specs: &[ProviderSpec]) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for spec in specs {
            if !seen.insert(spec.id()) {
                return Err(DenvError::DuplicateProvider(spec.id().to_string()));
            }
        }

        let mut registry = Self::new();
        for spec in specs {
            debug!(provider = %spec.id(), kind = spec.kind(), "initializing provider");
            let client = build_client(spec).await?;
            registry.insert(spec.id(), client)?;
        }
        Ok(registry)
    }

    /// Register an already constructed client.
    pub fn insert(&mut self, id: impl Into<String>, client: Arc<dyn SecretClient>) -> Result<()> {
        let id = id.into();
        if self.clients.contains_key(&id) {
            return Err(DenvError::DuplicateProvider(id));
        }
        debug!(provider = %id, kind = client.kind(), "registered provider");
        self.clients.insert(id, client);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn SecretClient>> {
        self.clients.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.clients.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let providers: std::collections::BTreeMap<&str, &str> = self
            .clients
            .iter()
            .map(|(id, client)| (id.as_str(), client.kind()))
            .collect();
        f.debug_struct("ProviderRegistry").field("providers", &providers).finish()
    }
}
