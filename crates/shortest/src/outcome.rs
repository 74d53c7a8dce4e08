//! Run outcomes - per test, per suite, per file and for a whole run

use crate::error::TestError;
use crate::registry::HookKind;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Lifecycle of a single test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pending,
    Running,
    Passed,
    Failed,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestStatus::Pending => "pending",
            TestStatus::Running => "running",
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Final result of one test
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub name: String,
    pub status: TestStatus,
    pub error: Option<TestError>,
    pub duration: Duration,
}

impl TestOutcome {
    pub fn passed(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Passed,
            error: None,
            duration,
        }
    }

    pub fn failed(name: impl Into<String>, error: TestError, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Failed,
            error: Some(error),
            duration,
        }
    }

    pub fn is_pass(&self) -> bool {
        self.status == TestStatus::Passed
    }

    pub fn is_fail(&self) -> bool {
        self.status == TestStatus::Failed
    }
}

/// A hook that raised an error
#[derive(Debug, Clone)]
pub struct HookFailure {
    pub kind: HookKind,
    /// Position of the hook within its list
    pub index: usize,
    pub error: TestError,
}

/// Results of one suite, tests in execution order
#[derive(Debug, Clone, Default)]
pub struct SuiteOutcome {
    pub name: String,
    pub tests: Vec<TestOutcome>,
    pub hook_failures: Vec<HookFailure>,
}

impl SuiteOutcome {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn passed_count(&self) -> usize {
        self.tests.iter().filter(|t| t.is_pass()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.tests.iter().filter(|t| t.is_fail()).count()
    }

    /// True when a `beforeAll` hook failed
    pub fn setup_failed(&self) -> bool {
        self.hook_failures
            .iter()
            .any(|f| f.kind == HookKind::BeforeAll)
    }
}

/// Results of one test file
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub suites: Vec<SuiteOutcome>,
    pub duration: Duration,
}

impl FileOutcome {
    pub fn tests(&self) -> impl Iterator<Item = &TestOutcome> {
        self.suites.iter().flat_map(|s| s.tests.iter())
    }

    pub fn passed(&self) -> bool {
        !self.tests().any(TestOutcome::is_fail)
    }
}

/// Results of a whole run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub files: Vec<FileOutcome>,
    pub started_at: DateTime<Local>,
    pub duration: Duration,
}

impl RunReport {
    pub fn tests(&self) -> impl Iterator<Item = &TestOutcome> {
        self.files.iter().flat_map(FileOutcome::tests)
    }

    /// Run verdict: true iff no test failed
    pub fn passed(&self) -> bool {
        !self.tests().any(TestOutcome::is_fail)
    }

    pub fn total(&self) -> usize {
        self.tests().count()
    }

    pub fn passed_count(&self) -> usize {
        self.tests().filter(|t| t.is_pass()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.tests().filter(|t| t.is_fail()).count()
    }
}
