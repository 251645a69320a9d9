//! Vault Configuration
//!
//! Runtime settings with:
//! - Presets (standard, strict)
//! - Environment and JSON overlays
//! - Validation of the configured limits

use serde::{Deserialize, Serialize};

use crate::error::{VaultError, VaultResult};

/// Default cap on deterministic-signature nonce streams
pub const DEFAULT_MAX_SIGNATURE_ATTEMPTS: u32 = 128;

/// Default upper bound for one batch address derivation
pub const DEFAULT_MAX_BATCH_COUNT: u32 = 1000;

pub const ENV_MAX_SIGNATURE_ATTEMPTS: &str = "HDVAULT_MAX_SIGNATURE_ATTEMPTS";
pub const ENV_MAX_BATCH_COUNT: &str = "HDVAULT_MAX_BATCH_COUNT";
pub const ENV_DEBUG: &str = "HDVAULT_DEBUG";

/// Vault settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultSettings {
    /// Nonce streams tried before a recoverable signature search gives up
    pub max_signature_attempts: u32,
    /// Largest `count` accepted by batch address derivation
    pub max_batch_count: u32,
    /// Emit debug-level log lines
    pub debug_logging: bool,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self::standard()
    }
}

impl VaultSettings {
    pub fn standard() -> Self {
        Self {
            max_signature_attempts: DEFAULT_MAX_SIGNATURE_ATTEMPTS,
            max_batch_count: DEFAULT_MAX_BATCH_COUNT,
            debug_logging: false,
        }
    }

    /// Tighter limits for shared signing hosts
    pub fn strict() -> Self {
        Self {
            max_signature_attempts: 32,
            max_batch_count: 100,
            debug_logging: false,
        }
    }

    pub fn validate(&self) -> VaultResult<()> {
        if self.max_signature_attempts == 0 {
            return Err(VaultError::invalid_config("max_signature_attempts must be at least 1"));
        }
        if self.max_batch_count == 0 {
            return Err(VaultError::invalid_config("max_batch_count must be at least 1"));
        }
        Ok(())
    }

    /// Legal but unusual choices worth surfacing at start-up
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.max_signature_attempts < 8 {
            warnings.push(format!(
                "max_signature_attempts={} may reject keys that need a few retries",
                self.max_signature_attempts
            ));
        }
        if self.max_signature_attempts > 100_000 {
            warnings.push("max_signature_attempts is effectively unbounded".to_string());
        }
        if self.max_batch_count > 100_000 {
            warnings.push(format!(
                "max_batch_count={} allows very long derivation batches",
                self.max_batch_count
            ));
        }
        if self.debug_logging {
            warnings.push("debug logging is enabled".to_string());
        }

        warnings
    }

    /// Load settings from a JSON object; absent keys keep their standard values.
    pub fn from_json_str(json: &str) -> VaultResult<Self> {
        let document: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| VaultError::invalid_config(format!("invalid settings document: {}", e)))?;
        if !document.is_object() {
            return Err(VaultError::invalid_config("settings document must be a JSON object"));
        }
        let settings: Self = serde_json::from_value(document)
            .map_err(|e| VaultError::invalid_config(format!("invalid settings document: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Standard settings overlaid with `HDVAULT_*` environment variables.
    pub fn from_env() -> VaultResult<Self> {
        Self::standard().overlay(|name| std::env::var(name).ok())
    }

    /// Apply overrides looked up by variable name.
    pub fn overlay<F>(mut self, lookup: F) -> VaultResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_SIGNATURE_ATTEMPTS) {
            self.max_signature_attempts = parse_u32(ENV_MAX_SIGNATURE_ATTEMPTS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_BATCH_COUNT) {
            self.max_batch_count = parse_u32(ENV_MAX_BATCH_COUNT, &value)?;
        }
        if let Some(value) = lookup(ENV_DEBUG) {
            self.debug_logging = matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        self.validate()?;
        Ok(self)
    }
}

fn parse_u32(name: &str, value: &str) -> VaultResult<u32> {
    value
        .trim()
        .parse()
        .map_err(|e| VaultError::invalid_config(format!("{}={:?}: {}", name, value, e)))
}
