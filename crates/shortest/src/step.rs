//! Step execution seam
//!
//! The runner never interprets a step's payload. Steps with an inline check
//! are run directly; every other step is handed to a [`StepExecutor`].

use crate::builder::{Step, TestRef};
use crate::error::TestError;
use async_trait::async_trait;
use std::cell::RefCell;
use std::rc::Rc;

/// Where a step is being executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepContext {
    /// Step `index` of a test
    Test { test: TestRef, index: usize },
    /// Step `index` of a suite hook
    Hook { suite: String, index: usize },
}

/// Carries out one declared step
#[async_trait(?Send)]
pub trait StepExecutor {
    async fn execute(&self, step: &Step, ctx: &StepContext) -> Result<(), TestError>;
}

/// Accepts every step without doing anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExecutor;

#[async_trait(?Send)]
impl StepExecutor for NoopExecutor {
    async fn execute(&self, step: &Step, ctx: &StepContext) -> Result<(), TestError> {
        tracing::debug!(step = %step.description, ?ctx, "step skipped by no-op executor");
        Ok(())
    }
}

/// Records every step it sees and fails steps whose description matches one
/// of the configured failures
#[derive(Debug, Default, Clone)]
pub struct RecordingExecutor {
    seen: Rc<RefCell<Vec<String>>>,
    failing: Vec<String>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, description: impl Into<String>) -> Self {
        self.failing.push(description.into());
        self
    }

    /// Descriptions of executed steps, in execution order
    pub fn seen(&self) -> Vec<String> {
        self.seen.borrow().clone()
    }
}

#[async_trait(?Send)]
impl StepExecutor for RecordingExecutor {
    async fn execute(&self, step: &Step, _ctx: &StepContext) -> Result<(), TestError> {
        self.seen.borrow_mut().push(step.description.clone());
        if self.failing.iter().any(|f| f == &step.description) {
            return Err(TestError::step(&step.description, "configured to fail"));
        }
        Ok(())
    }
}
