//! Error types for keyjar.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias for backend and job operations.
pub type Result<T> = std::result::Result<T, KeychainError>;

/// Portable outcome code attached to every completed job.
///
/// Every native condition a backend can hit is mapped onto exactly one of
/// these kinds. Anything a backend cannot classify becomes [`ErrorKind::OtherError`]
/// and keeps the native message for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The operation succeeded.
    NoError,
    /// No secret is stored under the requested identity.
    EntryNotFound,
    /// The store refused access (locked keychain, dismissed prompt, ACL).
    AccessDenied,
    /// No usable secret store exists on this system.
    NoBackendAvailable,
    /// The identity cannot be expressed to a native store.
    InvalidIdentity,
    /// Any other failure, including oversized payloads and timeouts.
    OtherError,
}

impl ErrorKind {
    /// Whether this kind signals success.
    pub fn is_ok(self) -> bool {
        self == ErrorKind::NoError
    }

    fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NoError => "no error",
            ErrorKind::EntryNotFound => "entry not found",
            ErrorKind::AccessDenied => "access denied",
            ErrorKind::NoBackendAvailable => "no backend available",
            ErrorKind::InvalidIdentity => "invalid identity",
            ErrorKind::OtherError => "other error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed errors produced by backends and by the job layer.
#[derive(Debug, Clone, Error)]
pub enum KeychainError {
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("No keychain backend available")]
    NoBackendAvailable,

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Payload too large: {len} bytes exceeds the backend limit of {max} bytes")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("Operation timed out after {millis}ms; the native call may still complete")]
    Timeout { millis: u64 },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KeychainError {
    /// The portable kind this error maps onto.
    pub fn kind(&self) -> ErrorKind {
        match self {
            KeychainError::EntryNotFound(_) => ErrorKind::EntryNotFound,
            KeychainError::AccessDenied(_) => ErrorKind::AccessDenied,
            KeychainError::NoBackendAvailable => ErrorKind::NoBackendAvailable,
            KeychainError::InvalidIdentity(_) => ErrorKind::InvalidIdentity,
            KeychainError::PayloadTooLarge { .. }
            | KeychainError::Timeout { .. }
            | KeychainError::Backend(_)
            | KeychainError::Internal(_) => ErrorKind::OtherError,
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON5 parse error: {0}")]
    Json5(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
