//! The contract every secret-store adapter implements.

use async_trait::async_trait;

use crate::error::Result;
use crate::identity::Identity;
use crate::secret::SecretBytes;

/// Async trait for secret-store backends.
///
/// Each call acts on exactly one identity. Calls on different identities must
/// not interfere, and concurrent calls on the same identity may complete in any
/// order but must never leave a partially written value behind.
///
/// Callers never pass the reserved empty/empty identity; the job layer
/// rejects it before dispatch.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Probe whether the underlying store can be used on this system.
    ///
    /// Called once, when the selector resolves.
    async fn is_available(&self) -> bool;

    /// Largest payload this backend accepts, if it has a fixed limit.
    fn max_payload_len(&self) -> Option<usize> {
        None
    }

    /// Store `payload` under `identity`, replacing any existing value.
    async fn write(&self, identity: &Identity, payload: &[u8]) -> Result<()>;

    /// Retrieve the value stored under `identity`.
    async fn read(&self, identity: &Identity) -> Result<SecretBytes>;

    /// Remove the value stored under `identity`.
    async fn delete(&self, identity: &Identity) -> Result<()>;
}
