//! Test reporter - display test progress and the run summary

use crate::error::{AssertionError, TestError};
use crate::outcome::TestStatus;
use chrono::{DateTime, Local};
use colored::*;
use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

/// Receives lifecycle events from the runner.
///
/// A reporter owns presentation only. Its [`all_tests_passed`] answer must
/// match the runner's own verdict, so implementations derive it from the
/// statuses they were given and nothing else.
///
/// [`all_tests_passed`]: Reporter::all_tests_passed
pub trait Reporter {
    fn start_file(&mut self, path: &Path);
    fn start_suite(&mut self, name: &str);
    fn report_test(&mut self, name: &str, status: TestStatus, error: Option<&TestError>);
    fn report_error(&mut self, context: &str, message: &str);
    fn summary(&mut self);
    fn all_tests_passed(&self) -> bool;
}

#[derive(Debug, Clone)]
struct TestRecord {
    name: String,
    status: TestStatus,
}

#[derive(Debug, Clone)]
struct SuiteRecord {
    name: String,
    tests: Vec<TestRecord>,
}

/// Terminal reporter with status icons and a closing summary
pub struct ConsoleReporter {
    out: Box<dyn Write>,
    /// Print pending/running transitions as well as final statuses
    verbose: bool,
    suites: Vec<SuiteRecord>,
    started_at: DateTime<Local>,
    start: Instant,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write>) -> Self {
        Self {
            out,
            verbose: false,
            suites: Vec::new(),
            started_at: Local::now(),
            start: Instant::now(),
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn status_icon(status: TestStatus) -> ColoredString {
        match status {
            TestStatus::Pending => "○".yellow(),
            TestStatus::Running => "●".blue(),
            TestStatus::Passed => "✓".green(),
            TestStatus::Failed => "✗".red(),
        }
    }

    fn counts(&self) -> (usize, usize) {
        let total = self.suites.iter().map(|s| s.tests.len()).sum();
        let failed = self
            .suites
            .iter()
            .flat_map(|s| s.tests.iter())
            .filter(|t| t.status == TestStatus::Failed)
            .count();
        (total, failed)
    }

    /// Render an assertion failure as expected / received / message lines
    fn write_assertion(&mut self, error: &AssertionError, indent: &str) {
        let _ = writeln!(self.out, "{}", format!("{}Expected: {}", indent, error.expected).red());
        let _ = writeln!(self.out, "{}", format!("{}Received: {}", indent, error.actual).red());
        let _ = writeln!(self.out, "{}", format!("{}Message: {}", indent, error.message).red());
    }

    /// Names and final statuses recorded so far, per suite
    pub fn results(&self) -> Vec<(String, Vec<(String, TestStatus)>)> {
        self.suites
            .iter()
            .map(|s| {
                (
                    s.name.clone(),
                    s.tests.iter().map(|t| (t.name.clone(), t.status)).collect(),
                )
            })
            .collect()
    }
}

impl Reporter for ConsoleReporter {
    fn start_file(&mut self, path: &Path) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let _ = writeln!(self.out, "\n{}", format!("📄 {}", name.bold()).blue());
    }

    fn start_suite(&mut self, name: &str) {
        self.suites.push(SuiteRecord {
            name: name.to_string(),
            tests: Vec::new(),
        });
        let _ = writeln!(self.out, "  {}", name.bold());
    }

    fn report_test(&mut self, name: &str, status: TestStatus, error: Option<&TestError>) {
        let terminal = matches!(status, TestStatus::Passed | TestStatus::Failed);
        if terminal || self.verbose {
            let _ = writeln!(self.out, "    {} {}", Self::status_icon(status), name);
        }
        if !terminal {
            return;
        }

        match error.and_then(TestError::assertion) {
            Some(assertion) => self.write_assertion(assertion, "      "),
            None => {
                if let Some(error) = error {
                    let _ = writeln!(self.out, "      {}", error.to_string().dimmed());
                }
            }
        }

        if self.suites.is_empty() {
            self.suites.push(SuiteRecord {
                name: String::new(),
                tests: Vec::new(),
            });
        }
        if let Some(suite) = self.suites.last_mut() {
            suite.tests.push(TestRecord {
                name: name.to_string(),
                status,
            });
        }
    }

    fn report_error(&mut self, context: &str, message: &str) {
        let _ = writeln!(
            self.out,
            "{}",
            format!("\n{} Error: {}", context, message).red()
        );
    }

    fn summary(&mut self) {
        let (total, failed) = self.counts();
        let passed = total - failed;
        let duration = self.start.elapsed();

        let _ = writeln!(self.out, "{}", "⎯".repeat(50).dimmed());

        let failed_part = if failed > 0 {
            format!("{} ", format!("{} failed", failed).red())
        } else {
            String::new()
        };
        let separator = if failed > 0 && passed > 0 { "| " } else { "" };
        let _ = writeln!(
            self.out,
            "\n{} {}{}{} {}",
            " Tests     ".bold(),
            failed_part,
            separator,
            format!("{} passed", passed).green(),
            format!("({})", total).dimmed()
        );
        let _ = writeln!(
            self.out,
            "{} {}",
            " Duration  ".bold(),
            format!("{:.2}s", duration.as_secs_f64()).dimmed()
        );
        let _ = writeln!(
            self.out,
            "{} {}",
            " Start at  ".bold(),
            self.started_at.format("%H:%M:%S").to_string().dimmed()
        );
        let _ = writeln!(self.out, "{}", format!("\n{}", "⎯".repeat(50)).dimmed());
        let _ = self.out.flush();
    }

    fn all_tests_passed(&self) -> bool {
        !self
            .suites
            .iter()
            .any(|s| s.tests.iter().any(|t| t.status == TestStatus::Failed))
    }
}
