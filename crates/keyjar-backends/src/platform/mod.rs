//! Compile-time choice of the native secret store.

use std::sync::Arc;

use keyjar_core::{Backend, KeychainConfig};

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use macos::KeychainBackend;

#[cfg(any(target_os = "windows", test))]
mod chunked;
#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
pub use windows::CredentialBackend;

#[cfg(any(
    target_os = "linux",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd"
))]
mod secret_service;
#[cfg(any(
    target_os = "linux",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "netbsd"
))]
pub use self::secret_service::SecretServiceBackend;

/// The native backend compiled in for this platform, if there is one.
///
/// Whether it is actually usable is decided later by its
/// [`Backend::is_available`] probe.
pub fn platform_backend(config: &KeychainConfig) -> Option<Arc<dyn Backend>> {
    #[cfg(target_os = "macos")]
    {
        let _ = config;
        Some(Arc::new(KeychainBackend::new()))
    }

    #[cfg(target_os = "windows")]
    {
        let _ = config;
        Some(Arc::new(CredentialBackend::new()))
    }

    #[cfg(any(
        target_os = "linux",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd"
    ))]
    {
        Some(Arc::new(SecretServiceBackend::new(
            config.secret_service.clone(),
        )))
    }

    #[cfg(not(any(
        target_os = "macos",
        target_os = "windows",
        target_os = "linux",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd"
    )))]
    {
        let _ = config;
        tracing::warn!("no native secret store on this platform");
        None
    }
}
