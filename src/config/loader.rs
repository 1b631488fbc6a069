//! Configuration file loading, validation and template generation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::{Config, ConfigDocument, EnvValue, SecretRef};
use crate::error::{DenvError, Result};

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "denv.kdl";

const TEMPLATE: &str = r#"// denv configuration file
//
// Providers are secret backends. Each one gets an id that env declarations
// refer to through `secret-ref provider="<id>"`.
providers {
    // AWS Secrets Manager
    // aws "aws-dev" region="us-east-1" profile="default"

    // GCP Secret Manager (location selects a regional endpoint)
    // gcp "gcp-prod" project="my-project" location="us-east1"

    // 1Password through the `op` CLI (default) or a service account token
    // onepassword "op" auth="cli" account="my.1password.com"
    // onepassword "op-ci" auth="service-account" token-env="OP_SERVICE_ACCOUNT_TOKEN"
}

// Literal value
env "APP_ENV" value="development"

// Secret value; `property` picks a field out of a JSON secret
// env "DB_PASSWORD" {
//     secret-ref provider="aws-dev" key="prod/db" property="password"
// }
"#;

impl Config {
    /// Parse and validate configuration text. `file_name` is used in error messages.
    pub fn parse(file_name: &str, content: &str) -> Result<Self> {
        let document = knuffel::parse::<ConfigDocument>(file_name, content)
            .map_err(|e| DenvError::config(format!("{}: {}", file_name, e)))?;
        Self::from_document(document)
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DenvError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
        let config = Self::parse(&name, &content)?;
        debug!(
            path = %path.display(),
            providers = config.providers.len(),
            envs = config.envs.len(),
            "loaded config"
        );
        Ok(config)
    }

    /// Validate a raw document and build the env map.
    ///
    /// Each env must declare exactly one of `value` or `secret-ref`, and
    /// names must be unique.
    pub fn from_document(document: ConfigDocument) -> Result<Self> {
        let mut envs = BTreeMap::new();

        for entry in document.envs {
            if entry.name.is_empty() {
                return Err(DenvError::config("env name cannot be empty"));
            }

            let env_value = match (entry.value, entry.secret_ref) {
                (Some(_), Some(_)) => {
                    return Err(DenvError::config(format!(
                        "env '{}' sets both value and secret-ref; choose one",
                        entry.name
                    )));
                }
                (None, None) => {
                    return Err(DenvError::config(format!(
                        "env '{}' needs a value or a secret-ref (use value=\"\" for an empty variable)",
                        entry.name
                    )));
                }
                (Some(value), None) => EnvValue::literal(value),
                (None, Some(node)) => {
                    let secret_ref = SecretRef::from(node);
                    if secret_ref.provider.is_empty() || secret_ref.key.is_empty() {
                        return Err(DenvError::config(format!(
                            "env '{}': secret-ref needs both provider and key",
                            entry.name
                        )));
                    }
                    EnvValue::secret(secret_ref)
                }
            };

            if envs.insert(entry.name.clone(), env_value).is_some() {
                return Err(DenvError::config(format!(
                    "env '{}' is declared more than once",
                    entry.name
                )));
            }
        }

        Ok(Config {
            providers: document.providers.map(|p| p.specs).unwrap_or_default(),
            envs,
        })
    }

    /// Write a commented template config file.
    pub fn generate_config_file(path: Option<PathBuf>, overwrite: bool) -> Result<PathBuf> {
        let config_path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if config_path.exists() && !overwrite {
            return Err(DenvError::config(format!(
                "Config file already exists at: {}. Use --overwrite to replace it.",
                config_path.display()
            )));
        }

        if let Some(parent) = config_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&config_path, TEMPLATE)?;
        Ok(config_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OnePasswordAuthMethod, ProviderSpec};

    const FULL: &str = r#"
providers {
    aws "aws-dev" service="SecretsManager" region="us-east-1" profile="dev" {
        shared-config-files "~/.aws/config" "/etc/aws/config"
    }
    gcp "gcp-prod" project="my-project" location="us-east1"
    onepassword "op"
    onepassword "op-ci" auth="service-account" token-env="CI_OP_TOKEN"
}

env "EXAMPLE_ENV" value="example-value"
env "EMPTY" value=""
env "DB_PASSWORD" {
    secret-ref provider="aws-dev" key="prod/db" property="password"
}
"#;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse("denv.kdl", FULL).unwrap();

        assert_eq!(config.providers.len(), 4);
        match &config.providers[0] {
            ProviderSpec::Aws(aws) => {
                assert_eq!(aws.id, "aws-dev");
                assert_eq!(aws.region.as_deref(), Some("us-east-1"));
                assert_eq!(aws.profile.as_deref(), Some("dev"));
                assert_eq!(
                    aws.shared_config_files.as_deref(),
                    Some(&["~/.aws/config".to_string(), "/etc/aws/config".to_string()][..])
                );
            }
            other => panic!("expected aws, got {other:?}"),
        }
        match &config.providers[1] {
            ProviderSpec::Gcp(gcp) => {
                assert_eq!(gcp.project, "my-project");
                assert_eq!(gcp.location.as_deref(), Some("us-east1"));
                assert_eq!(gcp.service, None);
            }
            other => panic!("expected gcp, got {other:?}"),
        }
        match (&config.providers[2], &config.providers[3]) {
            (ProviderSpec::Onepassword(cli), ProviderSpec::Onepassword(sa)) => {
                assert_eq!(cli.auth_method(), OnePasswordAuthMethod::Cli);
                assert_eq!(sa.auth_method(), OnePasswordAuthMethod::ServiceAccount);
                assert_eq!(sa.token_env.as_deref(), Some("CI_OP_TOKEN"));
            }
            other => panic!("expected onepassword pair, got {other:?}"),
        }

        assert_eq!(
            config.envs.get("EXAMPLE_ENV"),
            Some(&EnvValue::literal("example-value"))
        );
        assert_eq!(config.envs.get("EMPTY"), Some(&EnvValue::literal("")));
        assert_eq!(
            config.envs.get("DB_PASSWORD"),
            Some(&EnvValue::secret(
                SecretRef::new("aws-dev", "prod/db").with_property("password")
            ))
        );
    }

    #[test]
    fn test_parse_without_providers() {
        let config = Config::parse("denv.kdl", r#"env "A" value="1""#).unwrap();
        assert!(config.providers.is_empty());
        assert_eq!(config.envs.len(), 1);
    }

    #[test]
    fn test_both_value_and_ref_rejected() {
        let err = Config::parse(
            "denv.kdl",
            r#"
env "A" value="x" {
    secret-ref provider="p" key="k"
}
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("both value and secret-ref"));
    }

    #[test]
    fn test_neither_value_nor_ref_rejected() {
        let err = Config::parse("denv.kdl", r#"env "A""#).unwrap_err();
        assert!(err.to_string().contains("needs a value or a secret-ref"));
    }

    #[test]
    fn test_duplicate_env_rejected() {
        let err = Config::parse(
            "denv.kdl",
            r#"
env "A" value="1"
env "A" value="2"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("declared more than once"));
    }

    #[test]
    fn test_unknown_backend_is_a_parse_error() {
        let result = Config::parse(
            "denv.kdl",
            r#"
providers {
    vault "v"
}
"#,
        );
        assert!(matches!(result, Err(DenvError::Config(_))));
    }

    #[test]
    fn test_generated_template_parses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("denv.kdl");

        let written = Config::generate_config_file(Some(path.clone()), false).unwrap();
        assert_eq!(written, path);

        let config = Config::load_from_path(&path).unwrap();
        assert!(config.providers.is_empty());
        assert_eq!(
            config.envs.get("APP_ENV"),
            Some(&EnvValue::literal("development"))
        );

        // Refuses to clobber without overwrite
        assert!(Config::generate_config_file(Some(path.clone()), false).is_err());
        assert!(Config::generate_config_file(Some(path), true).is_ok());
    }
}
