//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level keyjar configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeychainConfig {
    /// Which backend the selector resolves to.
    #[serde(default)]
    pub backend: BackendPreference,

    /// Upper bound for a single backend call, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_timeout_ms: Option<u64>,

    /// In-process backend settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Secret Service (D-Bus) settings.
    #[serde(default)]
    pub secret_service: SecretServiceConfig,
}

/// Backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// The store compiled in for this platform.
    #[default]
    Auto,
    /// The in-process memory store.
    Memory,
    /// No backend; every job reports `NoBackendAvailable`.
    None,
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendPreference::Auto => "auto",
            BackendPreference::Memory => "memory",
            BackendPreference::None => "none",
        })
    }
}

impl FromStr for BackendPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(BackendPreference::Auto),
            "memory" => Ok(BackendPreference::Memory),
            "none" => Ok(BackendPreference::None),
            other => Err(format!(
                "unknown backend '{other}', expected one of: auto, memory, none"
            )),
        }
    }
}

/// In-process backend settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Reject payloads above this many bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload_len: Option<usize>,
}

/// Secret Service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretServiceConfig {
    /// Collection label to store items in; the default collection when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    /// Prefix for the human-readable item label shown by keyring managers.
    #[serde(default = "default_label_prefix")]
    pub label_prefix: String,
}

impl Default for SecretServiceConfig {
    fn default() -> Self {
        Self {
            collection: None,
            label_prefix: default_label_prefix(),
        }
    }
}

fn default_label_prefix() -> String {
    "keyjar".to_string()
}
