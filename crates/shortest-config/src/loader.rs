//! Configuration Loader
//!
//! Reads shortest.toml and applies environment overrides on top of it.

use crate::project::{is_valid_base_url, ShortestConfig};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Project config file name
pub const CONFIG_FILE: &str = "shortest.toml";

/// Env files read from the project directory, highest precedence first
pub const ENV_FILES: [&str; 2] = [".env.local", ".env"];

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_TEST_PATTERN: &str = "**/*.test.toml";

/// Configuration loader
///
/// Precedence, lowest first:
/// 1. Defaults
/// 2. Project config (./shortest.toml)
/// 3. `.env`, then `.env.local`
/// 4. Process environment
/// 5. CLI flags - handled by caller
#[derive(Debug, Default)]
pub struct ConfigLoader;

/// Resolved configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Values from the file, with environment overrides applied
    pub project: ShortestConfig,

    /// The file the values came from, if any
    pub config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self
    }

    /// Load `shortest.toml` from `dir` if present, then apply the environment.
    ///
    /// The env files in `dir` are read first, so they take effect even when
    /// the config file turns out to be malformed. A missing file yields
    /// defaults. A file that exists but cannot be parsed is an error.
    pub fn load_from_directory(&self, dir: &Path) -> ConfigResult<Config> {
        self.load_env_files(dir)?;
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Config {
                project: self.apply_env_overrides(ShortestConfig::default())?,
                config_path: None,
            });
        }
        self.load_from_file(&config_path)
    }

    /// Load a specific config file, then apply the environment
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let project = ShortestConfig::load_from_file(config_path)?;
        Ok(Config {
            project: self.apply_env_overrides(project)?,
            config_path: Some(config_path.to_path_buf()),
        })
    }

    /// Export `.env.local` and `.env` from `dir` into the process environment.
    ///
    /// Variables that are already set are never overwritten, so the real
    /// environment beats `.env.local`, which beats `.env`. Missing files are
    /// skipped.
    pub fn load_env_files(&self, dir: &Path) -> ConfigResult<Vec<PathBuf>> {
        let mut loaded = Vec::new();
        for name in ENV_FILES {
            let file = dir.join(name);
            if !file.is_file() {
                continue;
            }
            dotenvy::from_path(&file).map_err(|error| ConfigError::EnvFileError {
                file: file.clone(),
                error,
            })?;
            loaded.push(file);
        }
        Ok(loaded)
    }

    /// Apply environment variable overrides
    ///
    /// Recognized: SHORTEST_HEADLESS, SHORTEST_BASE_URL, SHORTEST_TIMEOUT_MS,
    /// GITHUB_TOTP_SECRET
    fn apply_env_overrides(&self, mut config: ShortestConfig) -> ConfigResult<ShortestConfig> {
        if let Ok(headless) = env::var("SHORTEST_HEADLESS") {
            config.headless = Some(parse_bool(&headless));
        }

        if let Ok(url) = env::var("SHORTEST_BASE_URL") {
            if !is_valid_base_url(&url) {
                return Err(ConfigError::InvalidValue {
                    field: "SHORTEST_BASE_URL".to_string(),
                    reason: format!("'{}' is not an http(s) URL", url),
                });
            }
            config.base_url = Some(url);
        }

        if let Ok(timeout) = env::var("SHORTEST_TIMEOUT_MS") {
            let ms = timeout
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    field: "SHORTEST_TIMEOUT_MS".to_string(),
                    reason: format!("'{}' is not a positive number of milliseconds", timeout),
                })?;
            config.timeout_ms = Some(ms);
        }

        if let Ok(secret) = env::var("GITHUB_TOTP_SECRET") {
            if !secret.is_empty() {
                config.github_totp_secret = Some(secret);
            }
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

impl Config {
    pub fn headless(&self) -> bool {
        self.project.headless.unwrap_or(false)
    }

    pub fn base_url(&self) -> &str {
        self.project.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Test directory, relative paths resolved against the config file's
    /// directory
    pub fn test_dir(&self) -> PathBuf {
        let dir = self
            .project
            .test_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        match self.config_path.as_deref().and_then(Path::parent) {
            Some(root) if dir.is_relative() => root.join(dir),
            _ => dir,
        }
    }

    pub fn test_pattern(&self) -> &str {
        self.project
            .test_pattern
            .as_deref()
            .unwrap_or(DEFAULT_TEST_PATTERN)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.project.timeout_ms.map(Duration::from_millis)
    }

    pub fn github_totp_secret(&self) -> Option<&str> {
        self.project.github_totp_secret.as_deref()
    }
}
