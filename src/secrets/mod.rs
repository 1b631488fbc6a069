//! Secret backends: the client contract, JSON property extraction, and the
//! per-backend implementations.

mod client;
mod property;
pub mod providers;

pub use client::SecretClient;
pub use property::{extract_property, select_property};
pub use providers::{ProviderRegistry, build_client};
