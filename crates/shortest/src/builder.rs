//! Test case builder
//!
//! A [`TestCase`] is a plain value: a name plus an ordered list of steps.
//! Building it has no side effects. Attaching it to a suite is an explicit
//! second step, either [`TestCase::register`] against the registry's active
//! suite or [`SuiteScope::test`](crate::SuiteScope::test) for a known suite.

use crate::error::{RegistryError, TestError};
use crate::registry::Registry;
use futures_util::future::{FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Inline check attached to a step, run by the runner instead of the executor
pub type CheckFn = Rc<dyn Fn() -> LocalBoxFuture<'static, Result<(), TestError>>>;

/// Phase of a step within a test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Given,
    When,
    Expect,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Given => write!(f, "given"),
            StepKind::When => write!(f, "when"),
            StepKind::Expect => write!(f, "expect"),
        }
    }
}

/// One declared step. The payload is opaque to the registry and runner and is
/// only interpreted by the step executor.
#[derive(Clone)]
pub struct Step {
    pub kind: StepKind,
    pub description: String,
    pub payload: serde_json::Value,
    check: Option<CheckFn>,
}

impl Step {
    pub fn new(kind: StepKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            payload: serde_json::Value::Null,
            check: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_check<F, Fut>(mut self, check: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.check = Some(Rc::new(move || {
            check().map(|res| res.map_err(TestError::from)).boxed_local()
        }));
        self
    }

    pub fn check(&self) -> Option<&CheckFn> {
        self.check.as_ref()
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("kind", &self.kind)
            .field("description", &self.description)
            .field("payload", &self.payload)
            .field("has_check", &self.check.is_some())
            .finish()
    }
}

/// Identifies a registered test
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestRef {
    pub suite_name: String,
    pub test_name: String,
}

impl TestRef {
    pub fn new(suite_name: impl Into<String>, test_name: impl Into<String>) -> Self {
        Self {
            suite_name: suite_name.into(),
            test_name: test_name.into(),
        }
    }
}

/// A declared test case
#[derive(Debug, Clone)]
pub struct TestCase {
    suite_name: Option<String>,
    test_name: String,
    steps: Vec<Step>,
}

impl TestCase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            suite_name: None,
            test_name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn given(self, description: impl Into<String>) -> Self {
        self.step(Step::new(StepKind::Given, description))
    }

    pub fn when(self, description: impl Into<String>) -> Self {
        self.step(Step::new(StepKind::When, description))
    }

    pub fn expect(self, description: impl Into<String>) -> Self {
        self.step(Step::new(StepKind::Expect, description))
    }

    /// Expectation checked by `check` rather than by the step executor
    pub fn expect_with<F, Fut>(self, description: impl Into<String>, check: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.step(Step::new(StepKind::Expect, description).with_check(check))
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn name(&self) -> &str {
        &self.test_name
    }

    /// Owning suite; `None` until registered
    pub fn suite_name(&self) -> Option<&str> {
        self.suite_name.as_deref()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub(crate) fn set_suite_name(&mut self, suite: &str) {
        self.suite_name = Some(suite.to_string());
    }

    /// Attach this test to the registry's currently active suite
    pub fn register(self, registry: &Registry) -> Result<TestRef, RegistryError> {
        registry.register_test(self)
    }
}
