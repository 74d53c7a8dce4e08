//! Shortest - declarative end-to-end test definitions
//!
//! Test files declare suites with [`Scope::define`], attach `beforeAll` /
//! `afterAll` hooks, and register [`TestCase`]s built from given / when /
//! expect steps. The [`TestRunner`] loads files one at a time, waits for their
//! registrations to settle, and executes each suite in declaration order while
//! a [`Reporter`] renders progress.
//!
//! ```no_run
//! use shortest::{ConsoleReporter, FnLoader, TestCase, TestRunner};
//! use std::path::Path;
//! use std::rc::Rc;
//!
//! let loader = FnLoader::new().file("login.rs", |scope| {
//!     let _ = scope.define("Login", |s| {
//!         s.test(TestCase::new("signs in").when("the user submits the form"));
//!         async {}
//!     });
//! });
//! let mut runner = TestRunner::new(Rc::new(loader), ConsoleReporter::new());
//! let report = shortest::runtime::block_on(runner.run_file(Path::new("login.rs")))
//!     .unwrap()
//!     .unwrap();
//! assert!(report.passed());
//! ```

pub mod builder;
pub mod discovery;
pub mod error;
pub mod expect;
pub mod loader;
pub mod outcome;
pub mod registry;
pub mod reporter;
pub mod runner;
pub mod runtime;
pub mod scope;
pub mod shell;
pub mod step;

pub use builder::{Step, StepKind, TestCase, TestRef};
pub use discovery::{FileDiscovery, PathFilter, PatternDiscovery};
pub use error::{
    AssertionError, DiscoveryError, LoadError, RegistrationKind, RegistryError, RunError,
    TestError,
};
pub use expect::{expect, Expectation};
pub use loader::{FnLoader, TestLoader, TomlLoader};
pub use outcome::{FileOutcome, RunReport, SuiteOutcome, TestOutcome, TestStatus};
pub use registry::{HookFn, HookKind, Registry, SuiteHooks};
pub use reporter::{ConsoleReporter, Reporter};
pub use runner::TestRunner;
pub use scope::{Registration, Scope, SuiteScope};
pub use shell::ShellExecutor;
pub use step::{NoopExecutor, RecordingExecutor, StepContext, StepExecutor};

/// Shortest version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
