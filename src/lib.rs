//! denv - generate `.env` files from the secret managers you already use.
//!
//! A `denv.kdl` file declares secret backends (AWS Secrets Manager, GCP
//! Secret Manager, 1Password) and the environment variables to materialize,
//! either as literal values or as references into a backend. This crate
//! provides functionality to:
//! - Resolve all declared variables concurrently, failing fast
//! - Write and read dotenv files with stable ordering and escaping
//! - Detect drift between a dotenv file and the declared environment
//!
//! # Example
//!
//! ```no_run
//! use denv::{Config, ProviderRegistry, resolve_all};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), denv::DenvError> {
//!     let config = Config::load_from_path("denv.kdl".as_ref())?;
//!     let registry = ProviderRegistry::from_specs(&config.providers).await?;
//!     let env = resolve_all(&config, &registry).await?;
//!     println!("{}", denv::dotenv::marshal(&env));
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod diff;
pub mod dotenv;
pub mod error;
pub mod logging;
pub mod resolve;
pub mod secrets;
pub mod utils;

// Re-export commonly used types at the crate root
pub use config::{Config, EnvValue, ProviderSpec, SecretRef};
pub use diff::{ChangeValue, Diff, compute_diff};
pub use error::{DenvError, Result};
pub use resolve::{ResolveOptions, ResolvedEnvMap, resolve_all, resolve_envs};
pub use secrets::{ProviderRegistry, SecretClient};
