//! Secret Service adapter (GNOME Keyring, KWallet, KeePassXC) over D-Bus.
//!
//! Items carry two lookup attributes, `service` and `username`, taken
//! verbatim from the identity. Values are stored as a single binary secret.
//! Writes go to the configured collection (matched by label, created on first
//! use) or to the default collection.

use std::collections::HashMap;

use async_trait::async_trait;
use keyjar_core::config::SecretServiceConfig;
use keyjar_core::{Backend, Identity, KeychainError, Result, SecretBytes};
use secret_service::{Collection, EncryptionType, Error as SsError, SecretService};
use tracing::{debug, warn};

const CONTENT_TYPE: &str = "application/octet-stream";

/// Storage in the desktop keyring exposed through `org.freedesktop.secrets`.
#[derive(Debug, Clone, Default)]
pub struct SecretServiceBackend {
    config: SecretServiceConfig,
}

impl SecretServiceBackend {
    pub fn new(config: SecretServiceConfig) -> Self {
        Self { config }
    }

    fn label(&self, identity: &Identity) -> String {
        format!("{}:{}", self.config.label_prefix, identity)
    }

    /// The collection this backend stores into, unlocked.
    async fn collection<'s>(
        &self,
        ss: &'s SecretService<'_>,
        create: bool,
    ) -> Result<Collection<'s>> {
        let collection = match &self.config.collection {
            None => ss
                .get_default_collection()
                .await
                .map_err(|e| map_error("open default collection", e))?,
            Some(label) => {
                let mut found = None;
                for collection in ss
                    .get_all_collections()
                    .await
                    .map_err(|e| map_error("list collections", e))?
                {
                    if collection.get_label().await.ok().as_deref() == Some(label.as_str()) {
                        found = Some(collection);
                        break;
                    }
                }
                match found {
                    Some(collection) => collection,
                    None if create => {
                        debug!(collection = %label, "creating secret service collection");
                        ss.create_collection(label, "")
                            .await
                            .map_err(|e| map_error("create collection", e))?
                    }
                    None => {
                        return Err(KeychainError::EntryNotFound(format!(
                            "collection '{label}' does not exist"
                        )))
                    }
                }
            }
        };

        if collection.is_locked().await.unwrap_or(true) {
            collection
                .unlock()
                .await
                .map_err(|e| map_error("unlock collection", e))?;
        }
        Ok(collection)
    }
}

fn attributes(identity: &Identity) -> HashMap<&str, &str> {
    [("service", identity.service()), ("username", identity.key())]
        .into_iter()
        .collect()
}

async fn connect() -> Result<SecretService<'static>> {
    SecretService::connect(EncryptionType::Dh)
        .await
        .map_err(|e| map_error("connect", e))
}

/// Map a Secret Service failure onto the portable taxonomy.
fn map_error(op: &str, err: SsError) -> KeychainError {
    match err {
        SsError::Locked | SsError::Prompt => {
            KeychainError::AccessDenied(format!("secret service {op}: {err}"))
        }
        SsError::NoResult => KeychainError::EntryNotFound(format!("secret service {op}")),
        // The selector's probe decides availability; a daemon vanishing
        // mid-call is an ordinary failure.
        other => {
            warn!(op, "secret service call failed: {other}");
            KeychainError::Backend(format!("secret service {op} failed: {other}"))
        }
    }
}

#[async_trait]
impl Backend for SecretServiceBackend {
    fn name(&self) -> &'static str {
        "secret-service"
    }

    async fn is_available(&self) -> bool {
        match connect().await {
            Ok(_) => true,
            Err(e) => {
                debug!("secret service unavailable: {e}");
                false
            }
        }
    }

    async fn write(&self, identity: &Identity, payload: &[u8]) -> Result<()> {
        debug!(service = identity.service(), key = identity.key(), "secret service write");
        let ss = connect().await?;
        let collection = self.collection(&ss, true).await?;
        collection
            .create_item(
                &self.label(identity),
                attributes(identity),
                payload,
                true, // Replace if exists
                CONTENT_TYPE,
            )
            .await
            .map_err(|e| map_error("create item", e))?;
        Ok(())
    }

    async fn read(&self, identity: &Identity) -> Result<SecretBytes> {
        debug!(service = identity.service(), key = identity.key(), "secret service read");
        let ss = connect().await?;
        let collection = self.collection(&ss, false).await?;
        let items = collection
            .search_items(attributes(identity))
            .await
            .map_err(|e| map_error("search items", e))?;

        let item = items
            .first()
            .ok_or_else(|| KeychainError::EntryNotFound(identity.to_string()))?;

        if item.is_locked().await.unwrap_or(true) {
            item.unlock()
                .await
                .map_err(|e| map_error("unlock item", e))?;
        }

        let secret = item
            .get_secret()
            .await
            .map_err(|e| map_error("get secret", e))?;
        Ok(SecretBytes::new(secret))
    }

    async fn delete(&self, identity: &Identity) -> Result<()> {
        debug!(service = identity.service(), key = identity.key(), "secret service delete");
        let ss = connect().await?;
        let collection = self.collection(&ss, false).await?;
        let items = collection
            .search_items(attributes(identity))
            .await
            .map_err(|e| map_error("search items", e))?;

        if items.is_empty() {
            return Err(KeychainError::EntryNotFound(identity.to_string()));
        }
        for item in &items {
            item.delete()
                .await
                .map_err(|e| map_error("delete item", e))?;
        }
        Ok(())
    }
}
