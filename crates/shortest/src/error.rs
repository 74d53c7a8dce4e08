//! Error types for registration, loading, discovery and execution
//!
//! Only [`RunError`] is fatal to a run. Everything a test or hook can raise is
//! a [`TestError`] and ends up in an outcome record instead of unwinding.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// What kind of declaration was being registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationKind {
    Test,
    BeforeAll,
    AfterAll,
}

impl fmt::Display for RegistrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationKind::Test => write!(f, "test"),
            RegistrationKind::BeforeAll => write!(f, "beforeAll hook"),
            RegistrationKind::AfterAll => write!(f, "afterAll hook"),
        }
    }
}

/// Registry errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A test or hook was registered while no suite was being defined.
    /// The declaration is not attached anywhere.
    #[error("{kind} registered outside of any define() block was dropped")]
    NoActiveSuite { kind: RegistrationKind },
}

/// Errors raised while loading a test file
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Test file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML syntax in {path}: {error}")]
    Parse {
        path: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid test file {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// Errors raised while discovering test files
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Invalid test pattern '{pattern}': {error}")]
    InvalidPattern {
        pattern: String,
        error: regex::Error,
    },

    #[error("Failed to walk {root}: {error}")]
    Walk {
        root: PathBuf,
        error: walkdir::Error,
    },
}

/// Fatal run errors. These abort the run before the affected file executes.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Test file not found: {0}")]
    FileNotFound(PathBuf),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}

/// Structured payload of a failed expectation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AssertionError {
    pub expected: String,
    pub actual: String,
    pub message: String,
}

impl AssertionError {
    pub fn new(
        expected: impl Into<String>,
        actual: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            expected: expected.into(),
            actual: actual.into(),
            message: message.into(),
        }
    }
}

/// Why a single test (or hook) failed
#[derive(Error, Debug, Clone)]
pub enum TestError {
    #[error("Assertion failed: {0}")]
    Assertion(#[from] AssertionError),

    #[error("Step '{step}' failed: {reason}")]
    Step { step: String, reason: String },

    #[error("Suite setup failed: {0}")]
    Setup(String),

    #[error("Timed out after {0:.2?}")]
    Timeout(Duration),

    #[error("{0}")]
    Hook(String),
}

impl TestError {
    pub fn step(step: impl Into<String>, reason: impl Into<String>) -> Self {
        TestError::Step {
            step: step.into(),
            reason: reason.into(),
        }
    }

    /// The assertion payload, if this failure came from an expectation
    pub fn assertion(&self) -> Option<&AssertionError> {
        match self {
            TestError::Assertion(err) => Some(err),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for TestError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AssertionError>() {
            Ok(assertion) => TestError::Assertion(assertion),
            Err(other) => match other.downcast::<TestError>() {
                Ok(test_error) => test_error,
                Err(other) => TestError::Hook(format!("{:#}", other)),
            },
        }
    }
}
