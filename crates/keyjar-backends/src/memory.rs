//! In-process secret store.
//!
//! Values live in a map keyed by [`Identity`] for the lifetime of the
//! backend. Useful on headless hosts and in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use keyjar_core::{Backend, Identity, KeychainError, Result, SecretBytes};
use parking_lot::RwLock;
use tracing::debug;

/// A secret store backed by a process-local map.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<Identity, SecretBytes>>,
    max_payload_len: Option<usize>,
}

impl MemoryBackend {
    /// Create an empty store with no payload limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that rejects payloads above `max` bytes.
    pub fn with_max_payload_len(max: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_payload_len: Some(max),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn max_payload_len(&self) -> Option<usize> {
        self.max_payload_len
    }

    async fn write(&self, identity: &Identity, payload: &[u8]) -> Result<()> {
        if let Some(max) = self.max_payload_len {
            if payload.len() > max {
                return Err(KeychainError::PayloadTooLarge {
                    len: payload.len(),
                    max,
                });
            }
        }

        debug!(service = identity.service(), key = identity.key(), "memory write");
        // The value is built before the lock is taken; readers see either the
        // old or the new value, never a partial one.
        let value = SecretBytes::new(payload);
        self.entries.write().insert(identity.clone(), value);
        Ok(())
    }

    async fn read(&self, identity: &Identity) -> Result<SecretBytes> {
        self.entries
            .read()
            .get(identity)
            .cloned()
            .ok_or_else(|| KeychainError::EntryNotFound(identity.to_string()))
    }

    async fn delete(&self, identity: &Identity) -> Result<()> {
        match self.entries.write().remove(identity) {
            Some(_) => Ok(()),
            None => Err(KeychainError::EntryNotFound(identity.to_string())),
        }
    }
}
