//! macOS Keychain Services adapter.
//!
//! Each identity is a generic password item: `service` goes into
//! `kSecAttrService` and `key` into `kSecAttrAccount`, so no composition is
//! needed. Keychain calls block (they may show an authorization prompt) and
//! run on the blocking thread pool.

use async_trait::async_trait;
use keyjar_core::{Backend, Identity, KeychainError, Result, SecretBytes};
use security_framework::base::Error as SecError;
use security_framework::passwords::{
    delete_generic_password, get_generic_password, set_generic_password,
};
use tracing::{debug, warn};

const ERR_SEC_USER_CANCELED: i32 = -128;
const ERR_SEC_AUTH_FAILED: i32 = -25293;
const ERR_SEC_ITEM_NOT_FOUND: i32 = -25300;
const ERR_SEC_INTERACTION_NOT_ALLOWED: i32 = -25308;

/// Generic-password storage in the user's default keychain.
#[derive(Debug, Default)]
pub struct KeychainBackend;

impl KeychainBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Map a Security.framework status onto the portable taxonomy.
fn map_error(op: &str, identity: &Identity, err: SecError) -> KeychainError {
    match err.code() {
        ERR_SEC_ITEM_NOT_FOUND => KeychainError::EntryNotFound(identity.to_string()),
        ERR_SEC_AUTH_FAILED | ERR_SEC_INTERACTION_NOT_ALLOWED | ERR_SEC_USER_CANCELED => {
            KeychainError::AccessDenied(format!("keychain {op} refused: {err}"))
        }
        code => {
            warn!(op, code, "keychain call failed");
            KeychainError::Backend(format!("keychain {op} failed ({code}): {err}"))
        }
    }
}

/// Run a blocking keychain call off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| KeychainError::Internal(format!("keychain task failed: {e}")))?
}

#[async_trait]
impl Backend for KeychainBackend {
    fn name(&self) -> &'static str {
        "macos-keychain"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn write(&self, identity: &Identity, payload: &[u8]) -> Result<()> {
        debug!(service = identity.service(), key = identity.key(), "keychain write");
        let id = identity.clone();
        let value = SecretBytes::new(payload);
        blocking(move || {
            set_generic_password(id.service(), id.key(), value.expose())
                .map_err(|e| map_error("write", &id, e))
        })
        .await
    }

    async fn read(&self, identity: &Identity) -> Result<SecretBytes> {
        debug!(service = identity.service(), key = identity.key(), "keychain read");
        let id = identity.clone();
        blocking(move || {
            get_generic_password(id.service(), id.key())
                .map(SecretBytes::new)
                .map_err(|e| map_error("read", &id, e))
        })
        .await
    }

    async fn delete(&self, identity: &Identity) -> Result<()> {
        debug!(service = identity.service(), key = identity.key(), "keychain delete");
        let id = identity.clone();
        blocking(move || {
            delete_generic_password(id.service(), id.key())
                .map_err(|e| map_error("delete", &id, e))
        })
        .await
    }
}
