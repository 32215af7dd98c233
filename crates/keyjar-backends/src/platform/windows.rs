//! Windows Credential Manager adapter, through `keyring`'s native store.
//!
//! Each identity maps to a generic credential whose target name is
//! [`Identity::target_name`]; values too large for one credential are split
//! as described in [`super::chunked`].

use std::sync::Arc;

use async_trait::async_trait;
use keyjar_core::{Backend, Identity, KeychainError, Result, SecretBytes};
use keyring::{Entry, Error as KeyringError};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::chunked::{ChunkedStore, CredentialStore, MAX_PAYLOAD_LEN};

const PROBE_TARGET: &str = "keyjar\\#probe/";

/// `keyring` entries addressed by explicit target names.
#[derive(Debug, Default)]
struct KeyringStore;

fn entry(target: &str, identity: &Identity) -> Result<Entry> {
    Entry::new_with_target(target, identity.service(), identity.key())
        .map_err(|e| map_keyring_error(e, target))
}

fn map_keyring_error(err: KeyringError, target: &str) -> KeychainError {
    match err {
        KeyringError::NoEntry => KeychainError::EntryNotFound(target.to_string()),
        KeyringError::NoStorageAccess(e) => {
            KeychainError::AccessDenied(format!("credential store refused {target}: {e}"))
        }
        other => {
            warn!(credential = target, "credential manager call failed: {other}");
            KeychainError::Backend(format!("Credential Manager error: {other}"))
        }
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, target: &str, identity: &Identity) -> Result<String> {
        entry(target, identity)?
            .get_password()
            .map_err(|e| map_keyring_error(e, target))
    }

    fn set(&self, target: &str, identity: &Identity, value: &str) -> Result<()> {
        entry(target, identity)?
            .set_password(value)
            .map_err(|e| map_keyring_error(e, target))
    }

    fn remove(&self, target: &str, identity: &Identity) -> Result<()> {
        entry(target, identity)?
            .delete_password()
            .map_err(|e| map_keyring_error(e, target))
    }
}

/// Generic-credential storage for the current logon session.
#[derive(Debug, Default)]
pub struct CredentialBackend {
    chunks: Arc<ChunkedStore<KeyringStore>>,
    // Keeps in-process writers from orphaning each other's segments; held
    // only inside blocking closures.
    lock: Arc<Mutex<()>>,
}

impl CredentialBackend {
    pub fn new() -> Self {
        Self::default()
    }

    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&ChunkedStore<KeyringStore>) -> Result<T> + Send + 'static,
    {
        let chunks = Arc::clone(&self.chunks);
        let lock = Arc::clone(&self.lock);
        tokio::task::spawn_blocking(move || {
            let _guard = lock.lock();
            f(&chunks)
        })
        .await
        .map_err(|e| KeychainError::Internal(format!("credential task failed: {e}")))?
    }
}

#[async_trait]
impl Backend for CredentialBackend {
    fn name(&self) -> &'static str {
        "windows-credential-manager"
    }

    async fn is_available(&self) -> bool {
        let probe = tokio::task::spawn_blocking(|| {
            Entry::new_with_target(PROBE_TARGET, "keyjar", "probe")?.get_password()
        })
        .await;

        match probe {
            Ok(Ok(_)) | Ok(Err(KeyringError::NoEntry)) => true,
            Ok(Err(KeyringError::NoStorageAccess(e))) => {
                warn!("credential manager is not reachable: {e}");
                false
            }
            Ok(Err(e)) => {
                debug!("credential manager probe failed: {e}");
                true
            }
            Err(e) => {
                warn!("credential manager probe task failed: {e}");
                false
            }
        }
    }

    fn max_payload_len(&self) -> Option<usize> {
        Some(MAX_PAYLOAD_LEN)
    }

    async fn write(&self, identity: &Identity, payload: &[u8]) -> Result<()> {
        debug!(
            service = identity.service(),
            key = identity.key(),
            len = payload.len(),
            "credential write"
        );
        let id = identity.clone();
        let payload = SecretBytes::new(payload);
        self.run(move |chunks| chunks.write(&id, payload.expose()))
            .await
    }

    async fn read(&self, identity: &Identity) -> Result<SecretBytes> {
        debug!(service = identity.service(), key = identity.key(), "credential read");
        let id = identity.clone();
        self.run(move |chunks| chunks.read(&id).map(SecretBytes::new))
            .await
    }

    async fn delete(&self, identity: &Identity) -> Result<()> {
        debug!(service = identity.service(), key = identity.key(), "credential delete");
        let id = identity.clone();
        self.run(move |chunks| chunks.delete(&id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            map_keyring_error(KeyringError::NoEntry, "svc/user1"),
            KeychainError::EntryNotFound(t) if t == "svc/user1"
        ));
        assert!(matches!(
            map_keyring_error(
                KeyringError::Invalid("target".to_string(), "too long".to_string()),
                "svc/user1"
            ),
            KeychainError::Backend(_)
        ));
    }

    #[test]
    fn test_capacity_is_advertised() {
        let backend = CredentialBackend::new();
        assert_eq!(backend.max_payload_len(), Some(MAX_PAYLOAD_LEN));
        assert!(MAX_PAYLOAD_LEN >= 10_000 && MAX_PAYLOAD_LEN < 18_944);
    }
}
