//! Test runner - load test files one at a time and execute their suites
//!
//! For each file the runner:
//! 1. snapshots the registry,
//! 2. loads the file through the [`TestLoader`],
//! 3. waits until every `define` the file issued has finished registering,
//! 4. runs each suite that received declarations during that window.
//!
//! A file is never loaded while another file's registrations are pending.
//! Within a suite, `beforeAll` hooks, tests and `afterAll` hooks run strictly
//! one after another in registration order.

use crate::builder::{TestCase, TestRef};
use crate::discovery::FileDiscovery;
use crate::error::{LoadError, RunError, TestError};
use crate::loader::TestLoader;
use crate::outcome::{FileOutcome, HookFailure, RunReport, SuiteOutcome, TestOutcome, TestStatus};
use crate::registry::{HookFn, HookKind, Registry, SuitePlan};
use crate::reporter::{ConsoleReporter, Reporter};
use crate::scope::Scope;
use crate::step::{NoopExecutor, StepContext, StepExecutor};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Test runner with its collaborators
pub struct TestRunner<R: Reporter = ConsoleReporter> {
    registry: Registry,
    loader: Rc<dyn TestLoader>,
    discovery: Rc<dyn FileDiscovery>,
    executor: Rc<dyn StepExecutor>,
    reporter: R,
    /// Limit for a single test, hooks excluded
    timeout: Option<Duration>,
}

impl<R: Reporter> TestRunner<R> {
    /// Create a runner with its own registry, no discovered files and a
    /// no-op step executor
    pub fn new(loader: Rc<dyn TestLoader>, reporter: R) -> Self {
        Self {
            registry: Registry::new(),
            loader,
            discovery: Rc::new(Vec::<PathBuf>::new()),
            executor: Rc::new(NoopExecutor),
            reporter,
            timeout: None,
        }
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_discovery(mut self, discovery: Rc<dyn FileDiscovery>) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn with_executor(mut self, executor: Rc<dyn StepExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Set the timeout for individual tests
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }

    /// Load and run exactly one file
    pub async fn run_file(&mut self, path: &Path) -> Result<RunReport, RunError> {
        let started_at = Local::now();
        let start = Instant::now();

        let file = self.execute_file(path).await?;
        self.reporter.summary();

        Ok(RunReport {
            files: vec![file],
            started_at,
            duration: start.elapsed(),
        })
    }

    /// Discover files (optionally narrowed by `filter`) and run them in order
    pub async fn run_all(&mut self, filter: Option<&str>) -> Result<RunReport, RunError> {
        let started_at = Local::now();
        let start = Instant::now();

        let paths = self.discovery.discover(filter)?;
        tracing::debug!(count = paths.len(), "running test files");

        let mut files = Vec::with_capacity(paths.len());
        for path in &paths {
            files.push(self.execute_file(path).await?);
        }
        self.reporter.summary();

        Ok(RunReport {
            files,
            started_at,
            duration: start.elapsed(),
        })
    }

    async fn execute_file(&mut self, path: &Path) -> Result<FileOutcome, RunError> {
        let start = Instant::now();
        self.reporter.start_file(path);

        let checkpoint = self.registry.checkpoint();
        let scope = Scope::new(self.registry.clone());
        self.loader.load(path, &scope).map_err(|e| match e {
            LoadError::NotFound(path) => RunError::FileNotFound(path),
            other => RunError::Load(other),
        })?;
        scope.settle().await;

        let plans = self
            .registry
            .plan_since(&checkpoint, &scope.defined_suites());
        tracing::debug!(path = %path.display(), suites = plans.len(), "file registered");

        let mut suites = Vec::with_capacity(plans.len());
        for plan in &plans {
            suites.push(self.run_suite(plan).await);
        }

        Ok(FileOutcome {
            path: path.to_path_buf(),
            suites,
            duration: start.elapsed(),
        })
    }

    async fn run_suite(&mut self, plan: &SuitePlan) -> SuiteOutcome {
        self.reporter.start_suite(&plan.name);
        let mut outcome = SuiteOutcome::new(&plan.name);

        self.run_hooks(HookKind::BeforeAll, &plan.hooks.before_all, &mut outcome)
            .await;
        let setup_error = outcome
            .hook_failures
            .first()
            .map(|failure| failure.error.to_string());

        for test in &plan.tests {
            self.reporter
                .report_test(test.name(), TestStatus::Pending, None);

            let result = match &setup_error {
                Some(reason) => TestOutcome::failed(
                    test.name(),
                    TestError::Setup(reason.clone()),
                    Duration::ZERO,
                ),
                None => {
                    self.reporter
                        .report_test(test.name(), TestStatus::Running, None);
                    self.run_test(&plan.name, test).await
                }
            };

            self.reporter
                .report_test(&result.name, result.status, result.error.as_ref());
            outcome.tests.push(result);
        }

        self.run_hooks(HookKind::AfterAll, &plan.hooks.after_all, &mut outcome)
            .await;
        outcome
    }

    /// Run every hook of one kind; failures are recorded and do not stop the
    /// remaining hooks
    async fn run_hooks(&mut self, kind: HookKind, hooks: &[HookFn], outcome: &mut SuiteOutcome) {
        let context = match kind {
            HookKind::BeforeAll => "beforeAll",
            HookKind::AfterAll => "afterAll",
        };

        for (index, hook) in hooks.iter().enumerate() {
            if let Err(err) = hook().await {
                let error = TestError::from(err);
                tracing::warn!(suite = %outcome.name, hook = context, index, %error, "hook failed");
                self.reporter.report_error(context, &error.to_string());
                outcome.hook_failures.push(HookFailure { kind, index, error });
            }
        }
    }

    async fn run_test(&self, suite: &str, test: &TestCase) -> TestOutcome {
        let start = Instant::now();
        let test_ref = TestRef::new(suite, test.name());
        let work = execute_steps(Rc::clone(&self.executor), test, test_ref);

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(result) => result,
                Err(_) => Err(TestError::Timeout(limit)),
            },
            None => work.await,
        };

        match result {
            Ok(()) => TestOutcome::passed(test.name(), start.elapsed()),
            Err(error) => TestOutcome::failed(test.name(), error, start.elapsed()),
        }
    }
}

async fn execute_steps(
    executor: Rc<dyn StepExecutor>,
    test: &TestCase,
    test_ref: TestRef,
) -> Result<(), TestError> {
    for (index, step) in test.steps().iter().enumerate() {
        match step.check() {
            Some(check) => check().await?,
            None => {
                let ctx = StepContext::Test {
                    test: test_ref.clone(),
                    index,
                };
                executor.execute(step, &ctx).await?
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TestCase;
    use crate::expect::expect;
    use crate::loader::FnLoader;
    use crate::step::RecordingExecutor;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    #[derive(Default)]
    struct EventLog {
        events: Vec<String>,
        failed: bool,
    }

    impl Reporter for EventLog {
        fn start_file(&mut self, path: &Path) {
            self.events.push(format!("file {}", path.display()));
        }

        fn start_suite(&mut self, name: &str) {
            self.events.push(format!("suite {}", name));
        }

        fn report_test(&mut self, name: &str, status: TestStatus, _error: Option<&TestError>) {
            self.failed |= status == TestStatus::Failed;
            self.events.push(format!("{} {}", name, status));
        }

        fn report_error(&mut self, context: &str, _message: &str) {
            self.events.push(format!("error {}", context));
        }

        fn summary(&mut self) {
            self.events.push("summary".to_string());
        }

        fn all_tests_passed(&self) -> bool {
            !self.failed
        }
    }

    fn trace() -> Rc<RefCell<Vec<String>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn mark(
        trace: &Rc<RefCell<Vec<String>>>,
        label: &'static str,
    ) -> impl Fn() -> std::future::Ready<anyhow::Result<()>> {
        let trace = Rc::clone(trace);
        move || {
            trace.borrow_mut().push(label.to_string());
            std::future::ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let loader = FnLoader::new().file("a.rs", |scope| {
            let _ = scope.define("A", |s| {
                s.test(TestCase::new("t1"));
                async {}
            });
        });
        let mut runner = TestRunner::new(Rc::new(loader), EventLog::default());

        let report = runner.run_file(Path::new("a.rs")).await.unwrap();

        assert!(report.passed());
        assert_eq!(
            runner.reporter().events,
            vec![
                "file a.rs",
                "suite A",
                "t1 pending",
                "t1 running",
                "t1 passed",
                "summary"
            ]
        );
    }

    #[tokio::test]
    async fn test_hook_and_test_order() {
        let order = trace();
        let log = Rc::clone(&order);
        let loader = FnLoader::new().file("a.rs", move |scope| {
            let log = Rc::clone(&log);
            let _ = scope.define("A", move |s| {
                s.before_all(mark(&log, "before 1"));
                s.after_all(mark(&log, "after 1"));
                s.before_all(mark(&log, "before 2"));
                let during = Rc::clone(&log);
                s.test(TestCase::new("t1").expect_with("t1 runs", move || {
                    during.borrow_mut().push("t1".to_string());
                    async { Ok(()) }
                }));
                s.after_all(mark(&log, "after 2"));
                async {}
            });
        });
        let mut runner = TestRunner::new(Rc::new(loader), EventLog::default());

        runner.run_file(Path::new("a.rs")).await.unwrap();

        assert_eq!(
            *order.borrow(),
            vec!["before 1", "before 2", "t1", "after 1", "after 2"]
        );
    }

    #[tokio::test]
    async fn test_setup_failure_fails_all_tests_and_runs_teardown() {
        let order = trace();
        let log = Rc::clone(&order);
        let executor = RecordingExecutor::new();
        let loader = FnLoader::new().file("a.rs", move |scope| {
            let log = Rc::clone(&log);
            let _ = scope.define("A", move |s| {
                s.before_all(|| async { Err(anyhow::anyhow!("setup")) });
                s.test(TestCase::new("t1").when("step one"));
                s.test(TestCase::new("t2").when("step two"));
                s.after_all(mark(&log, "after"));
                async {}
            });
        });
        let mut runner = TestRunner::new(Rc::new(loader), EventLog::default())
            .with_executor(Rc::new(executor.clone()));

        let report = runner.run_file(Path::new("a.rs")).await.unwrap();

        let suite = &report.files[0].suites[0];
        assert!(suite.setup_failed());
        assert!(suite.tests.iter().all(TestOutcome::is_fail));
        assert!(matches!(suite.tests[0].error, Some(TestError::Setup(_))));
        assert!(executor.seen().is_empty());
        assert_eq!(*order.borrow(), vec!["after"]);
        assert!(!report.passed());
        assert!(!runner.reporter().all_tests_passed());
        assert!(runner
            .reporter()
            .events
            .iter()
            .all(|e| !e.starts_with("t1 running")));
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_remaining_tests() {
        let executor = RecordingExecutor::new().failing_on("broken step");
        let loader = FnLoader::new().file("a.rs", |scope| {
            let _ = scope.define("A", |s| {
                s.test(TestCase::new("t1").when("broken step").when("never reached"));
                s.test(TestCase::new("t2").expect_with("math", || async {
                    expect(1 + 1).to_be(3)?;
                    Ok(())
                }));
                s.test(TestCase::new("t3").when("fine"));
                s.after_all(|| async { Err(anyhow::anyhow!("teardown")) });
                async {}
            });
        });
        let mut runner = TestRunner::new(Rc::new(loader), EventLog::default())
            .with_executor(Rc::new(executor.clone()));

        let report = runner.run_file(Path::new("a.rs")).await.unwrap();

        let statuses: Vec<_> = report.tests().map(|t| (t.name.as_str(), t.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("t1", TestStatus::Failed),
                ("t2", TestStatus::Failed),
                ("t3", TestStatus::Passed),
            ]
        );
        assert!(report.tests().nth(1).unwrap().error.as_ref().unwrap().assertion().is_some());
        assert_eq!(executor.seen(), vec!["broken step", "fine"]);
        let suite = &report.files[0].suites[0];
        assert_eq!(suite.hook_failures.len(), 1);
        assert_eq!(suite.hook_failures[0].kind, HookKind::AfterAll);
        assert!(runner.reporter().events.contains(&"error afterAll".to_string()));
    }

    #[tokio::test]
    async fn test_timeout_is_a_failed_test() {
        let loader = FnLoader::new().file("a.rs", |scope| {
            let _ = scope.define("A", |s| {
                s.test(TestCase::new("slow").expect_with("waits", || async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(())
                }));
                s.test(TestCase::new("fast"));
                async {}
            });
        });
        let mut runner = TestRunner::new(Rc::new(loader), EventLog::default())
            .with_timeout(Some(Duration::from_millis(20)));

        let report = runner.run_file(Path::new("a.rs")).await.unwrap();

        let tests: Vec<_> = report.tests().collect();
        assert!(matches!(tests[0].error, Some(TestError::Timeout(_))));
        assert!(tests[1].is_pass());
    }

    #[tokio::test]
    async fn test_run_all_sequential_files() {
        let loader = FnLoader::new()
            .file("a.rs", |scope| {
                let _ = scope.define("A", |s| {
                    s.test(TestCase::new("t1"));
                    async {}
                });
            })
            .file("b.rs", |scope| {
                let _ = scope.define("B", |s| async move {
                    tokio::task::yield_now().await;
                    s.test(TestCase::new("t2"));
                });
            });
        let loader = Rc::new(loader);
        let mut runner = TestRunner::new(loader.clone(), EventLog::default())
            .with_discovery(loader);

        let report = runner.run_all(None).await.unwrap();

        assert_eq!(report.passed_count(), 2);
        assert!(report.passed());
        assert_eq!(report.passed(), runner.reporter().all_tests_passed());
        let registered: Vec<_> = runner
            .registry()
            .all_tests()
            .into_iter()
            .map(|(suite, tests)| (suite, tests.len()))
            .collect();
        assert_eq!(registered, vec![("A".to_string(), 1), ("B".to_string(), 1)]);
    }

    #[tokio::test]
    async fn test_redeclared_suite_runs_only_new_tests_per_file() {
        let loader = FnLoader::new()
            .file("a.rs", |scope| {
                let _ = scope.define("Shared", |s| {
                    s.test(TestCase::new("from a"));
                    async {}
                });
            })
            .file("b.rs", |scope| {
                let _ = scope.define("Shared", |s| {
                    s.test(TestCase::new("from b"));
                    async {}
                });
            });
        let loader = Rc::new(loader);
        let mut runner = TestRunner::new(loader.clone(), EventLog::default())
            .with_discovery(loader);

        let report = runner.run_all(None).await.unwrap();

        let per_file: Vec<Vec<&str>> = report
            .files
            .iter()
            .map(|f| f.tests().map(|t| t.name.as_str()).collect())
            .collect();
        assert_eq!(per_file, vec![vec!["from a"], vec!["from b"]]);
        assert_eq!(runner.registry().all_tests()["Shared"].len(), 2);
    }

    #[tokio::test]
    async fn test_redeclared_suite_runs_accumulated_hooks() {
        let order = trace();
        let (log_a, log_b) = (Rc::clone(&order), Rc::clone(&order));
        let loader = FnLoader::new()
            .file("a.rs", move |scope| {
                let log = Rc::clone(&log_a);
                let _ = scope.define("Shared", move |s| {
                    s.before_all(mark(&log, "before"));
                    s.after_all(mark(&log, "after"));
                    let during = Rc::clone(&log);
                    s.test(TestCase::new("t1").expect_with("t1 runs", move || {
                        during.borrow_mut().push("t1".to_string());
                        async { Ok(()) }
                    }));
                    async {}
                });
            })
            .file("b.rs", move |scope| {
                let log = Rc::clone(&log_b);
                let _ = scope.define("Shared", move |s| {
                    let during = Rc::clone(&log);
                    s.test(TestCase::new("t2").expect_with("t2 runs", move || {
                        during.borrow_mut().push("t2".to_string());
                        async { Ok(()) }
                    }));
                    async {}
                });
            });
        let loader = Rc::new(loader);
        let mut runner = TestRunner::new(loader.clone(), EventLog::default())
            .with_discovery(loader);

        let report = runner.run_all(None).await.unwrap();

        assert!(report.passed());
        assert_eq!(
            *order.borrow(),
            vec!["before", "t1", "after", "before", "t2", "after"]
        );
        let hooks = runner.registry().suite_hooks("Shared").unwrap();
        assert_eq!(hooks.before_all.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal() {
        let mut runner = TestRunner::new(Rc::new(FnLoader::new()), EventLog::default());
        let err = runner.run_file(Path::new("missing.rs")).await.unwrap_err();
        assert!(matches!(err, RunError::FileNotFound(_)));
        assert!(!runner.reporter().events.contains(&"summary".to_string()));
    }
}
