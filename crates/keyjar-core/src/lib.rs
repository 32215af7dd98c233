//! # keyjar-core
//!
//! Shared building blocks for keyjar:
//!
//! - **Errors**: the portable [`ErrorKind`] taxonomy and the typed [`KeychainError`]
//! - **Identity**: the `(service, key)` pair that addresses a secret
//! - **Backend**: the contract every secret-store adapter implements
//! - **Configuration**: loading and validation of [`KeychainConfig`]

pub mod backend;
pub mod config;
pub mod env;
pub mod error;
pub mod identity;
pub mod secret;

// Re-exports for convenience
pub use backend::Backend;
pub use config::{BackendPreference, KeychainConfig};
pub use error::{ConfigError, ErrorKind, KeychainError, Result};
pub use identity::Identity;
pub use secret::SecretBytes;
