//! Project Configuration (shortest.toml)

use crate::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings from shortest.toml; unset fields fall back to defaults
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ShortestConfig {
    /// Run the browser without a window
    pub headless: Option<bool>,

    /// Application under test
    pub base_url: Option<String>,

    /// Directory searched for test files
    pub test_dir: Option<PathBuf>,

    /// Glob matched against paths relative to `test_dir`
    pub test_pattern: Option<String>,

    /// Per-test timeout in milliseconds
    pub timeout_ms: Option<u64>,

    /// Base32 secret for GitHub 2FA codes
    pub github_totp_secret: Option<String>,
}

impl ShortestConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(url) = &self.base_url {
            if !is_valid_base_url(url) {
                return Err(ConfigError::InvalidValue {
                    field: "base_url".to_string(),
                    reason: format!("'{}' is not an http(s) URL", url),
                });
            }
        }

        if let Some(pattern) = &self.test_pattern {
            if pattern.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "test_pattern".to_string(),
                    reason: "pattern cannot be empty".to_string(),
                });
            }
        }

        if self.timeout_ms == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "timeout_ms".to_string(),
                reason: "timeout must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

pub(crate) fn is_valid_base_url(url: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme))
}
