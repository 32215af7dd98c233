//! Secret identities.
//!
//! A secret is addressed by `(service, key)`: `service` is the logical
//! namespace (usually an application name) and `key` the account within it.
//! Either half may be empty, but not both: the empty/empty identity is
//! reserved and never names a stored entry.

use std::fmt;

use crate::error::{KeychainError, Result};

/// Separator between the escaped service and the key in a composed target name.
const TARGET_SEPARATOR: char = '/';
const ESCAPE: char = '\\';

/// The `(service, key)` pair addressing a single secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Identity {
    service: String,
    key: String,
}

impl Identity {
    /// Create a new identity.
    pub fn new(service: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            key: key.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn set_service(&mut self, service: impl Into<String>) {
        self.service = service.into();
    }

    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = key.into();
    }

    /// Whether this is the reserved empty/empty identity.
    pub fn is_reserved(&self) -> bool {
        self.service.is_empty() && self.key.is_empty()
    }

    /// Check that the identity can be handed to a backend.
    ///
    /// The reserved identity yields [`KeychainError::EntryNotFound`]; an
    /// identity containing NUL characters cannot be expressed to the native
    /// C APIs and yields [`KeychainError::InvalidIdentity`].
    pub fn check(&self) -> Result<()> {
        if self.is_reserved() {
            return Err(KeychainError::EntryNotFound(
                "the empty service/key identity does not address an entry".to_string(),
            ));
        }
        if self.service.contains('\0') {
            return Err(KeychainError::InvalidIdentity(
                "service contains a NUL character".to_string(),
            ));
        }
        if self.key.contains('\0') {
            return Err(KeychainError::InvalidIdentity(
                "key contains a NUL character".to_string(),
            ));
        }
        Ok(())
    }

    /// Compose the single native name used by stores with one addressing field.
    ///
    /// The service is escaped (`\` → `\\`, `/` → `\/`) and joined to the key
    /// with `/`. The first unescaped `/` always marks the boundary, so distinct
    /// identities never share a target name.
    pub fn target_name(&self) -> String {
        let mut out = self.escaped_service();
        out.push(TARGET_SEPARATOR);
        out.push_str(&self.key);
        out
    }

    /// The service half of [`Identity::target_name`], escaped.
    ///
    /// An escaped service never contains `\` followed by anything other than
    /// `\` or `/`, which leaves sequences such as `\#` free for backends that
    /// need auxiliary names derived from an identity.
    pub fn escaped_service(&self) -> String {
        let mut out = String::with_capacity(self.service.len());
        for c in self.service.chars() {
            if c == ESCAPE || c == TARGET_SEPARATOR {
                out.push(ESCAPE);
            }
            out.push(c);
        }
        out
    }

    /// Inverse of [`Identity::target_name`].
    pub fn from_target_name(target: &str) -> Option<Self> {
        let mut service = String::new();
        let mut chars = target.char_indices();
        while let Some((idx, c)) = chars.next() {
            match c {
                ESCAPE => match chars.next()?.1 {
                    escaped @ (ESCAPE | TARGET_SEPARATOR) => service.push(escaped),
                    _ => return None,
                },
                TARGET_SEPARATOR => {
                    let key = &target[idx + c.len_utf8()..];
                    return Some(Self::new(service, key));
                }
                other => service.push(other),
            }
        }
        None
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.key, self.service)
    }
}
