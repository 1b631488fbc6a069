//! Turns declared environment variables into concrete values.
//!
//! Literal values are used as-is. Secret references are fetched concurrently
//! (bounded by [`ResolveOptions::concurrency`]) and the first failure cancels
//! everything still in flight. Resolution is all-or-nothing: a caller either
//! gets the complete map or a single error.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{Config, EnvValue, SecretRef};
use crate::error::{DenvError, Result};
use crate::secrets::{ProviderRegistry, SecretClient};

/// Concrete environment, ordered by name.
pub type ResolvedEnvMap = BTreeMap<String, String>;

pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Maximum number of secret fetches in flight. Values below 1 mean 1.
    pub concurrency: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ResolveOptions {
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }
}

/// Resolve every variable declared in `config` with default options.
pub async fn resolve_all(config: &Config, registry: &ProviderRegistry) -> Result<ResolvedEnvMap> {
    resolve_envs(
        &config.envs,
        registry,
        ResolveOptions::default(),
        &CancellationToken::new(),
    )
    .await
}

struct Fetch {
    name: String,
    client: Arc<dyn SecretClient>,
    reference: SecretRef,
}

/// Resolve `envs` against `registry`, honoring `cancel` in every fetch.
///
/// Every provider reference is checked before the first fetch starts, so a
/// `ProviderNotFound` never leaves backend calls behind.
pub async fn resolve_envs(
    envs: &BTreeMap<String, EnvValue>,
    registry: &ProviderRegistry,
    options: ResolveOptions,
    cancel: &CancellationToken,
) -> Result<ResolvedEnvMap> {
    let mut resolved = ResolvedEnvMap::new();
    let mut fetches = Vec::new();

    for (name, env) in envs {
        if let Some(value) = env.value.as_deref().filter(|v| !v.is_empty()) {
            resolved.insert(name.clone(), value.to_string());
        } else if let Some(reference) = &env.secret_ref {
            let client = registry
                .get(&reference.provider)
                .ok_or_else(|| DenvError::ProviderNotFound {
                    provider: reference.provider.clone(),
                    name: name.clone(),
                })?;
            fetches.push(Fetch {
                name: name.clone(),
                client: Arc::clone(client),
                reference: reference.clone(),
            });
        } else {
            resolved.insert(name.clone(), String::new());
        }
    }

    if fetches.is_empty() {
        return Ok(resolved);
    }

    let token = cancel.child_token();
    let permits = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let mut tasks = JoinSet::new();

    debug!(
        count = fetches.len(),
        concurrency = options.concurrency.max(1),
        "fetching secrets"
    );

    for fetch in fetches {
        tasks.spawn(fetch_one(fetch, Arc::clone(&permits), token.clone()));
    }

    while let Some(joined) = tasks.join_next().await {
        let outcome = match joined {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => Err(DenvError::Cancelled),
            Err(e) => Err(DenvError::Other(format!("resolution task failed: {}", e))),
        };

        match outcome {
            Ok((name, value)) => {
                resolved.insert(name, value);
            }
            Err(e) => {
                token.cancel();
                tasks.abort_all();
                if matches!(e, DenvError::Cancelled) {
                    warn!("secret resolution cancelled");
                }
                return Err(e);
            }
        }
    }

    Ok(resolved)
}

async fn fetch_one(
    fetch: Fetch,
    permits: Arc<Semaphore>,
    token: CancellationToken,
) -> Result<(String, String)> {
    let Fetch {
        name,
        client,
        reference,
    } = fetch;

    let _permit = tokio::select! {
        _ = token.cancelled() => return Err(DenvError::Cancelled),
        permit = permits.acquire_owned() => permit.map_err(|_| DenvError::Cancelled)?,
    };

    debug!(
        name = %name,
        provider = %reference.provider,
        key = %reference.key,
        "fetching secret"
    );

    let bytes = tokio::select! {
        _ = token.cancelled() => return Err(DenvError::Cancelled),
        result = client.get_secret(&reference) => {
            result.map_err(|e| DenvError::resolution(&name, e))?
        }
    };

    let value = String::from_utf8(bytes).map_err(|_| {
        DenvError::resolution(
            &name,
            DenvError::unavailable(
                &reference.provider,
                format!("secret '{}' is not valid UTF-8", reference.key),
            ),
        )
    })?;

    Ok((name, value))
}
