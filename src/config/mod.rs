//! Configuration loading and management.

mod loader;
mod types;

pub use loader::DEFAULT_CONFIG_FILE;
pub(crate) use types::expand_tilde;
pub use types::{
    AwsProvider, Config, ConfigDocument, EnvEntry, EnvValue, GcpProvider, OnePasswordAuthMethod,
    OnePasswordProvider, ProviderSpec, ProvidersBlock, SecretRef, SecretRefNode,
};
