//! Transport configuration parsing and validation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

/// Connection tuning parsed from TOML.
///
/// Every field has a default, so an empty document is a valid config.
///
/// ```toml
/// # Omit for no cap; a longer inbound line fails the connection.
/// max_line_bytes = 1048576
/// # 0 disables the timeout; requests wait for their response indefinitely.
/// request_timeout_seconds = 0
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct TransportConfig {
    /// Optional inbound line cap in bytes; `None` accepts lines of any length.
    #[serde(default)]
    pub max_line_bytes: Option<usize>,
    /// Outbound request timeout; 0 means no timeout.
    #[serde(default)]
    pub request_timeout_seconds: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: None,
            request_timeout_seconds: 0,
        }
    }
}

impl TransportConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Request timeout, or `None` when requests wait indefinitely.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_seconds > 0).then(|| Duration::from_secs(self.request_timeout_seconds))
    }

    fn validate(&self) -> Result<()> {
        if self.max_line_bytes == Some(0) {
            return Err(AppError::Config(
                "max_line_bytes must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
