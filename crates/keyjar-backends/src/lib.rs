//! Secret-store adapters for keyjar.
//!
//! [`MemoryBackend`] works everywhere. The native adapter for the current
//! operating system is chosen at compile time and returned by
//! [`platform_backend`]:
//!
//! - macOS: Keychain Services via `security-framework`
//! - Windows: Credential Manager via `keyring`
//! - Linux and the BSDs: Secret Service over D-Bus via `secret-service`

pub mod memory;
pub mod platform;

pub use memory::MemoryBackend;
pub use platform::platform_backend;
