//! Step executor that runs shell commands
//!
//! A step payload may carry:
//! - `run`: command line passed to `sh -c`; a non-zero exit fails the step
//! - `stdout`: text the command's standard output must contain
//!
//! Steps without `run` are descriptive only and pass. The target URL and
//! headless flag are exported as `SHORTEST_TARGET_URL` and `SHORTEST_HEADLESS`.

use crate::builder::Step;
use crate::error::TestError;
use crate::expect::expect;
use crate::step::{StepContext, StepExecutor};
use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

pub struct ShellExecutor {
    target_url: String,
    headless: bool,
}

impl ShellExecutor {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: target_url.into(),
            headless: false,
        }
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }
}

#[async_trait(?Send)]
impl StepExecutor for ShellExecutor {
    async fn execute(&self, step: &Step, ctx: &StepContext) -> Result<(), TestError> {
        let Some(command) = step.payload.get("run").and_then(Value::as_str) else {
            tracing::debug!(step = %step.description, ?ctx, "descriptive step");
            return Ok(());
        };

        tracing::debug!(step = %step.description, command, "running step");
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .env("SHORTEST_TARGET_URL", &self.target_url)
            .env("SHORTEST_HEADLESS", if self.headless { "1" } else { "0" })
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                TestError::step(&step.description, format!("failed to spawn `{}`: {}", command, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TestError::step(
                &step.description,
                format!("`{}` exited with {}: {}", command, output.status, stderr.trim()),
            ));
        }

        if let Some(expected) = step.payload.get("stdout").and_then(Value::as_str) {
            let stdout = String::from_utf8_lossy(&output.stdout);
            expect(&*stdout).to_contain(expected)?;
        }

        Ok(())
    }
}
