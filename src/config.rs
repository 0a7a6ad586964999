//! Runtime configuration.
//!
//! Every field has a default, so an empty JSON object (or
//! `RuntimeConfig::default()`) is a complete configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;
use crate::fetch::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Storage key of the persisted state blob.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Storage key of the dark mode flag.
    #[serde(default = "default_dark_mode_key")]
    pub dark_mode_key: String,
    /// Locale active right after mount.
    #[serde(default = "default_locale")]
    pub default_locale: String,
    /// Locale consulted when the active one has no table.
    #[serde(default = "default_locale")]
    pub fallback_locale: String,
    #[serde(default = "default_toast_duration_ms")]
    pub toast_duration_ms: u64,
    #[serde(default = "default_fetch_attempts")]
    pub fetch_attempts: u32,
    /// Base delay; attempt `n` waits `n * fetch_backoff_ms` before retrying.
    #[serde(default = "default_fetch_backoff_ms")]
    pub fetch_backoff_ms: u64,
    /// Connectivity reported at mount.
    #[serde(default = "default_online")]
    pub online: bool,
    /// Id of the element holding an embedded manifest.
    #[serde(default = "default_manifest_element_id")]
    pub manifest_element_id: String,
}

fn default_storage_key() -> String {
    "spark-dom".to_string()
}

fn default_dark_mode_key() -> String {
    "spark-dom-dark".to_string()
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_toast_duration_ms() -> u64 {
    3000
}

fn default_fetch_attempts() -> u32 {
    3
}

fn default_fetch_backoff_ms() -> u64 {
    1000
}

fn default_online() -> bool {
    true
}

fn default_manifest_element_id() -> String {
    "manifest".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            dark_mode_key: default_dark_mode_key(),
            default_locale: default_locale(),
            fallback_locale: default_locale(),
            toast_duration_ms: default_toast_duration_ms(),
            fetch_attempts: default_fetch_attempts(),
            fetch_backoff_ms: default_fetch_backoff_ms(),
            online: default_online(),
            manifest_element_id: default_manifest_element_id(),
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }

    /// Retry policy for [`fetch_with_retry`](crate::fetch::fetch_with_retry).
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.fetch_attempts.max(1),
            backoff: Duration::from_millis(self.fetch_backoff_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        let config = RuntimeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config =
            RuntimeConfig::from_json_str(r#"{"storageKey":"app","fetchAttempts":5}"#).unwrap();
        assert_eq!(config.storage_key, "app");
        assert_eq!(config.fetch_attempts, 5);
        assert_eq!(config.default_locale, "en");
        assert_eq!(config.retry_policy().attempts, 5);
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        let config = RuntimeConfig {
            fetch_attempts: 0,
            ..Default::default()
        };
        assert_eq!(config.retry_policy().attempts, 1);
    }

    #[test]
    fn test_bad_json_is_error() {
        assert!(RuntimeConfig::from_json_str("{").is_err());
    }
}
