use async_trait::async_trait;

use crate::config::SecretRef;
use crate::error::Result;

/// A connection to one configured secret backend.
///
/// Clients authenticate when they are constructed, never lazily inside
/// `get_secret`. One instance is shared by every resolution task that
/// references its provider, so `get_secret` must tolerate concurrent calls;
/// clients wrapping an exclusive resource serialize internally.
///
/// Dropping the returned future cancels the call.
#[async_trait]
pub trait SecretClient: Send + Sync {
    /// The provider ID this client was built for.
    fn id(&self) -> &str;

    /// Backend kind, e.g. "aws".
    fn kind(&self) -> &str;

    /// Fetch the secret named by `reference.key`.
    ///
    /// Returns the raw payload, or the value at `reference.property` when set.
    /// Fails with `SecretNotFound`, `PropertyNotFound` or `BackendUnavailable`.
    async fn get_secret(&self, reference: &SecretRef) -> Result<Vec<u8>>;
}
