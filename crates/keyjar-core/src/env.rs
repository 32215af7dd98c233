//! Environment variable handling.

use std::env;

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable as a u64.
pub fn get_u64(name: &str) -> Option<u64> {
    get_var(name).and_then(|v| v.trim().parse().ok())
}

/// Environment variable names read by keyjar.
pub mod vars {
    /// Backend preference override (`auto`, `memory`, `none`).
    pub const KEYJAR_BACKEND: &str = "KEYJAR_BACKEND";

    /// Per-operation timeout override in milliseconds.
    pub const KEYJAR_TIMEOUT_MS: &str = "KEYJAR_TIMEOUT_MS";

    /// Config file override.
    pub const KEYJAR_CONFIG: &str = "KEYJAR_CONFIG";

    /// Log filter used by hosts that install a subscriber.
    pub const KEYJAR_LOG: &str = "KEYJAR_LOG";
}
