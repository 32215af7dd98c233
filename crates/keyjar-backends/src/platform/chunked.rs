//! Values spread over several single-field credentials.
//!
//! Credential Manager caps each credential at 2560 bytes, which `keyring`
//! fills with UTF-16 text. Values are therefore base64-encoded in segments of
//! [`SEGMENT_LEN`] bytes, each stored as at most 1280 characters:
//!
//! - the primary credential ([`Identity::target_name`]) holds the header
//!   `<generation>:<count>:` followed by the first segment;
//! - segment `i >= 1` lives at `escaped_service + "\#<generation>.<i>/" + key`,
//!   a name no regular identity can produce.
//!
//! A write stores its trailing segments under a fresh generation, then
//! replaces the primary, then removes the previous generation's segments.
//! Readers follow the primary, so they see either the old value or the new
//! one, never a mix, and a failed write leaves the old value intact.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use keyjar_core::{Identity, KeychainError, Result};
use tracing::{debug, warn};

/// Raw bytes carried by one credential.
pub const SEGMENT_LEN: usize = 945;

/// Credentials used for one value, primary included.
pub const MAX_SEGMENTS: usize = 19;

/// Largest value that fits.
pub const MAX_PAYLOAD_LEN: usize = SEGMENT_LEN * MAX_SEGMENTS;

/// Retries when a concurrent writer replaces the value mid-read.
const READ_ATTEMPTS: usize = 3;

/// A flat store of text credentials addressed by target name.
pub trait CredentialStore: Send + Sync {
    /// The text stored under `target`; `EntryNotFound` if there is none.
    fn get(&self, target: &str, identity: &Identity) -> Result<String>;

    fn set(&self, target: &str, identity: &Identity, value: &str) -> Result<()>;

    /// Remove `target`; `EntryNotFound` if there is none.
    fn remove(&self, target: &str, identity: &Identity) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    generation: u32,
    count: usize,
}

fn segment_target(identity: &Identity, generation: u32, index: usize) -> String {
    format!(
        "{}\\#{generation:08x}.{index}/{}",
        identity.escaped_service(),
        identity.key()
    )
}

fn encode_primary(header: Header, first: &[u8]) -> String {
    format!(
        "{:08x}:{}:{}",
        header.generation,
        header.count,
        STANDARD.encode(first)
    )
}

fn decode_primary(text: &str, target: &str) -> Result<(Header, Vec<u8>)> {
    let corrupt =
        || KeychainError::Backend(format!("credential {target} has an unrecognised layout"));

    let mut parts = text.splitn(3, ':');
    let (Some(generation), Some(count), Some(body)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(corrupt());
    };
    let generation = u32::from_str_radix(generation, 16).map_err(|_| corrupt())?;
    let count: usize = count.parse().map_err(|_| corrupt())?;
    if !(1..=MAX_SEGMENTS).contains(&count) {
        return Err(corrupt());
    }
    let first = STANDARD.decode(body).map_err(|_| corrupt())?;
    Ok((Header { generation, count }, first))
}

fn fresh_generation(previous: Option<Header>) -> u32 {
    loop {
        let generation = rand::random::<u32>();
        if previous.map_or(true, |p| p.generation != generation) {
            return generation;
        }
    }
}

/// Chunked values on top of a [`CredentialStore`].
#[derive(Debug, Default)]
pub struct ChunkedStore<S> {
    store: S,
}

impl<S: CredentialStore> ChunkedStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    fn store(&self) -> &S {
        &self.store
    }

    pub fn write(&self, identity: &Identity, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(KeychainError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }

        let primary = identity.target_name();
        let previous = match self.store.get(&primary, identity) {
            Ok(text) => decode_primary(&text, &primary).ok().map(|(header, _)| header),
            Err(KeychainError::EntryNotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let segments: Vec<&[u8]> = if payload.is_empty() {
            vec![payload]
        } else {
            payload.chunks(SEGMENT_LEN).collect()
        };
        let header = Header {
            generation: fresh_generation(previous),
            count: segments.len(),
        };

        for (index, segment) in segments.iter().enumerate().skip(1) {
            let target = segment_target(identity, header.generation, index);
            if let Err(e) = self.store.set(&target, identity, &STANDARD.encode(segment)) {
                self.remove_segments(identity, Header { count: index, ..header });
                return Err(e);
            }
        }

        // Switching the primary commits the new value.
        if let Err(e) = self
            .store
            .set(&primary, identity, &encode_primary(header, segments[0]))
        {
            self.remove_segments(identity, header);
            return Err(e);
        }

        if let Some(previous) = previous {
            self.remove_segments(identity, previous);
        }
        Ok(())
    }

    pub fn read(&self, identity: &Identity) -> Result<Vec<u8>> {
        let primary = identity.target_name();
        let mut attempt = 1;
        loop {
            let (header, mut value) = decode_primary(&self.store.get(&primary, identity)?, &primary)?;
            match self.read_segments(identity, header, &mut value) {
                Ok(()) => return Ok(value),
                Err(KeychainError::EntryNotFound(name)) if attempt < READ_ATTEMPTS => {
                    debug!(segment = %name, "credential replaced during read, retrying");
                    attempt += 1;
                }
                Err(KeychainError::EntryNotFound(name)) => {
                    return Err(KeychainError::Backend(format!(
                        "credential segment {name} is missing"
                    )))
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn delete(&self, identity: &Identity) -> Result<()> {
        let primary = identity.target_name();
        let text = self.store.get(&primary, identity)?;
        self.store.remove(&primary, identity)?;
        if let Ok((header, _)) = decode_primary(&text, &primary) {
            self.remove_segments(identity, header);
        }
        Ok(())
    }

    fn read_segments(&self, identity: &Identity, header: Header, value: &mut Vec<u8>) -> Result<()> {
        for index in 1..header.count {
            let target = segment_target(identity, header.generation, index);
            let text = self.store.get(&target, identity)?;
            let segment = STANDARD.decode(text).map_err(|e| {
                KeychainError::Backend(format!("credential segment {target} is not valid: {e}"))
            })?;
            value.extend_from_slice(&segment);
        }
        Ok(())
    }

    /// Best-effort removal of a generation's trailing segments.
    fn remove_segments(&self, identity: &Identity, header: Header) {
        for index in 1..header.count {
            let target = segment_target(identity, header.generation, index);
            match self.store.remove(&target, identity) {
                Ok(()) | Err(KeychainError::EntryNotFound(_)) => {}
                Err(e) => warn!(segment = %target, "could not remove credential segment: {e}"),
            }
        }
    }
}
