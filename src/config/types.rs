//! Configuration type definitions.

use knuffel::{Decode, DecodeScalar};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Expand tilde (~) prefix to the user's home directory.
/// Handles both "~" alone and "~/path/to/something" patterns.
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// Raw document parsed from denv.kdl, before validation.
#[derive(Debug, Decode, Clone, Default)]
pub struct ConfigDocument {
    #[knuffel(child)]
    pub providers: Option<ProvidersBlock>,

    #[knuffel(children(name = "env"))]
    pub envs: Vec<EnvEntry>,
}

/// The `providers { ... }` block.
#[derive(Debug, Decode, Clone, Default)]
pub struct ProvidersBlock {
    #[knuffel(children)]
    pub specs: Vec<ProviderSpec>,
}

/// A configured secret backend instance. The node name selects the backend.
#[derive(Debug, Decode, Clone, PartialEq)]
pub enum ProviderSpec {
    Aws(AwsProvider),
    Gcp(GcpProvider),
    Onepassword(OnePasswordProvider),
}

impl ProviderSpec {
    pub fn id(&self) -> &str {
        match self {
            ProviderSpec::Aws(p) => &p.id,
            ProviderSpec::Gcp(p) => &p.id,
            ProviderSpec::Onepassword(p) => &p.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProviderSpec::Aws(_) => "aws",
            ProviderSpec::Gcp(_) => "gcp",
            ProviderSpec::Onepassword(_) => "onepassword",
        }
    }
}

/// AWS Secrets Manager connection settings.
#[derive(Debug, Decode, Clone, Default, PartialEq)]
pub struct AwsProvider {
    #[knuffel(argument)]
    pub id: String,

    /// Defaults to "SecretsManager".
    #[knuffel(property)]
    pub service: Option<String>,

    #[knuffel(property)]
    pub region: Option<String>,

    #[knuffel(property)]
    pub profile: Option<String>,

    /// Endpoint override, e.g. a LocalStack URL.
    #[knuffel(property)]
    pub endpoint: Option<String>,

    #[knuffel(child, unwrap(arguments))]
    pub shared_config_files: Option<Vec<String>>,

    #[knuffel(child, unwrap(arguments))]
    pub shared_credentials_files: Option<Vec<String>>,
}

/// GCP Secret Manager connection settings.
#[derive(Debug, Decode, Clone, Default, PartialEq)]
pub struct GcpProvider {
    #[knuffel(argument)]
    pub id: String,

    /// Defaults to "SecretManager".
    #[knuffel(property)]
    pub service: Option<String>,

    #[knuffel(property)]
    pub project: String,

    /// Regional secrets location. Selects the regional endpoint when set.
    #[knuffel(property)]
    pub location: Option<String>,
}

/// How a 1Password client authenticates.
#[derive(Debug, DecodeScalar, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnePasswordAuthMethod {
    /// Shell out to the `op` CLI, reusing its signed-in session.
    #[default]
    Cli,
    /// Use a service account token with the 1Password SDK.
    ServiceAccount,
}

/// 1Password connection settings.
#[derive(Debug, Decode, Clone, Default, PartialEq)]
pub struct OnePasswordProvider {
    #[knuffel(argument)]
    pub id: String,

    #[knuffel(property)]
    pub auth: Option<OnePasswordAuthMethod>,

    /// Account shorthand or sign-in address (CLI mode only).
    #[knuffel(property)]
    pub account: Option<String>,

    /// Environment variable holding the service account token.
    #[knuffel(property(name = "token-env"))]
    pub token_env: Option<String>,
}

impl OnePasswordProvider {
    pub fn auth_method(&self) -> OnePasswordAuthMethod {
        self.auth.unwrap_or_default()
    }
}

/// One `env "NAME" ...` declaration as written in the file.
#[derive(Debug, Decode, Clone, PartialEq)]
pub struct EnvEntry {
    #[knuffel(argument)]
    pub name: String,

    #[knuffel(property)]
    pub value: Option<String>,

    #[knuffel(child)]
    pub secret_ref: Option<SecretRefNode>,
}

/// The `secret-ref provider=".." key=".." property=".."` child node.
#[derive(Debug, Decode, Clone, PartialEq)]
pub struct SecretRefNode {
    #[knuffel(property)]
    pub provider: String,

    #[knuffel(property)]
    pub key: String,

    #[knuffel(property)]
    pub property: Option<String>,
}

/// A pointer to a secret value held by a configured provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRef {
    /// ID of the provider that holds the secret.
    pub provider: String,
    /// Backend-specific key (secret name, ARN, `op://` reference).
    pub key: String,
    /// Field inside a JSON payload; `None` means the raw payload.
    pub property: Option<String>,
}

impl SecretRef {
    pub fn new(provider: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            key: key.into(),
            property: None,
        }
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }
}

impl From<SecretRefNode> for SecretRef {
    fn from(node: SecretRefNode) -> Self {
        Self {
            provider: node.provider,
            key: node.key,
            // An empty property is the same as none.
            property: node.property.filter(|p| !p.is_empty()),
        }
    }
}

/// The declared value of one environment variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvValue {
    pub value: Option<String>,
    pub secret_ref: Option<SecretRef>,
}

impl EnvValue {
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            secret_ref: None,
        }
    }

    pub fn secret(secret_ref: SecretRef) -> Self {
        Self {
            value: None,
            secret_ref: Some(secret_ref),
        }
    }
}

/// Validated configuration: provider specs plus the declared environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub providers: Vec<ProviderSpec>,
    pub envs: BTreeMap<String, EnvValue>,
}
