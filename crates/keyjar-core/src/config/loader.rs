//! Configuration loading and validation.

use super::{BackendPreference, KeychainConfig};
use crate::env::{self, vars};
use crate::error::ConfigError;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

impl KeychainConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), backend = %config.backend, "loaded keychain config");
        Ok(config)
    }

    /// Load from `KEYJAR_CONFIG` when set, defaults otherwise, then apply
    /// environment overrides and validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match env::get_var(vars::KEYJAR_CONFIG) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Apply `KEYJAR_BACKEND` and `KEYJAR_TIMEOUT_MS` overrides.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env(&mut self) {
        if let Some(raw) = env::get_var(vars::KEYJAR_BACKEND) {
            match raw.parse::<BackendPreference>() {
                Ok(pref) => self.backend = pref,
                Err(e) => warn!("ignoring {}: {e}", vars::KEYJAR_BACKEND),
            }
        }

        if let Some(raw) = env::get_var(vars::KEYJAR_TIMEOUT_MS) {
            match env::get_u64(vars::KEYJAR_TIMEOUT_MS) {
                Some(ms) => self.operation_timeout_ms = Some(ms),
                None => warn!("ignoring {}={raw}: not a millisecond count", vars::KEYJAR_TIMEOUT_MS),
            }
        }
    }

    /// Validate the configuration, collecting all errors before returning.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.operation_timeout_ms == Some(0) {
            errors.push("operation_timeout_ms must be greater than 0".to_string());
        }

        if self.memory.max_payload_len == Some(0) {
            errors.push("memory.max_payload_len must be greater than 0".to_string());
        }

        if let Some(collection) = &self.secret_service.collection {
            if collection.trim().is_empty() {
                errors.push("secret_service.collection must not be blank".to_string());
            }
        }

        if self.secret_service.label_prefix.contains('\0') {
            errors.push("secret_service.label_prefix must not contain NUL".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}
