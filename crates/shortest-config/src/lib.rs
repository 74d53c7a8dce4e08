//! Shortest Configuration
//!
//! Settings are resolved in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Project config (./shortest.toml)
//! 3. Environment variables (SHORTEST_*, GITHUB_TOTP_SECRET), including
//!    those read from `.env.local` and `.env` in the project directory
//! 4. CLI flags (applied by the caller)
//!
//! # Example
//!
//! ```no_run
//! use shortest_config::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::new().load_from_directory(Path::new(".")).unwrap();
//! println!("testing against {}", config.base_url());
//! ```

pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid env file {file}: {error}")]
    EnvFileError {
        file: PathBuf,
        error: dotenvy::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

pub use loader::{Config, ConfigLoader, CONFIG_FILE, ENV_FILES};
pub use project::ShortestConfig;
