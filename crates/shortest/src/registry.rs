//! Suite registry and suite context manager
//!
//! The registry holds every suite declared so far: an ordered test list per
//! suite, a separate hook table per suite, and the name of the suite whose
//! `define` window is currently open. All mutation goes through the methods
//! here.
//!
//! A [`Registry`] is a cheap handle (`Rc<RefCell<..>>`). Everything runs on one
//! thread with cooperative scheduling, so there is no locking; ordering is
//! guaranteed by the runner loading one file at a time.

use crate::builder::{TestCase, TestRef};
use crate::error::{RegistrationKind, RegistryError};
use futures_util::future::{FutureExt, LocalBoxFuture};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Zero-argument suite hook
pub type HookFn = Rc<dyn Fn() -> LocalBoxFuture<'static, anyhow::Result<()>>>;

/// Wrap an async closure as a [`HookFn`]
pub fn hook<F, Fut>(f: F) -> HookFn
where
    F: Fn() -> Fut + 'static,
    Fut: Future<Output = anyhow::Result<()>> + 'static,
{
    Rc::new(move || f().boxed_local())
}

/// Which hook list a hook goes into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    BeforeAll,
    AfterAll,
}

impl From<HookKind> for RegistrationKind {
    fn from(kind: HookKind) -> Self {
        match kind {
            HookKind::BeforeAll => RegistrationKind::BeforeAll,
            HookKind::AfterAll => RegistrationKind::AfterAll,
        }
    }
}

/// Lifecycle hooks of one suite, in registration order
#[derive(Clone, Default)]
pub struct SuiteHooks {
    pub before_all: Vec<HookFn>,
    pub after_all: Vec<HookFn>,
}

impl SuiteHooks {
    fn list_mut(&mut self, kind: HookKind) -> &mut Vec<HookFn> {
        match kind {
            HookKind::BeforeAll => &mut self.before_all,
            HookKind::AfterAll => &mut self.after_all,
        }
    }
}

impl fmt::Debug for SuiteHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteHooks")
            .field("before_all", &self.before_all.len())
            .field("after_all", &self.after_all.len())
            .finish()
    }
}

#[derive(Default)]
struct RegistryState {
    suites: IndexMap<String, Vec<Rc<TestCase>>>,
    hooks: IndexMap<String, SuiteHooks>,
    current_suite: Option<String>,
}

impl RegistryState {
    fn ensure_suite(&mut self, name: &str) {
        if !self.suites.contains_key(name) {
            self.suites.insert(name.to_string(), Vec::new());
        }
        if !self.hooks.contains_key(name) {
            self.hooks.insert(name.to_string(), SuiteHooks::default());
        }
    }
}

/// Per-suite sizes captured by [`Registry::checkpoint`]
#[derive(Debug, Clone, Default)]
pub struct Checkpoint {
    sizes: HashMap<String, (usize, usize, usize)>,
}

/// The tests a suite gained after a checkpoint plus all of its hooks
#[derive(Clone)]
pub struct SuitePlan {
    pub name: String,
    pub tests: Vec<Rc<TestCase>>,
    pub hooks: SuiteHooks,
}

impl fmt::Debug for SuitePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuitePlan")
            .field("name", &self.name)
            .field(
                "tests",
                &self.tests.iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("hooks", &self.hooks)
            .finish()
    }
}

thread_local! {
    static GLOBAL: Registry = Registry::new();
}

/// Handle to a suite registry
#[derive(Clone, Default)]
pub struct Registry {
    state: Rc<RefCell<RegistryState>>,
}

impl Registry {
    /// Create an empty, independent registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The ambient registry of the current thread.
    ///
    /// Created on first use; later calls return the same registry. Only
    /// [`Registry::clear`] resets it.
    pub fn global() -> Registry {
        GLOBAL.with(Registry::clone)
    }

    /// Open a suite's definition window, creating the suite if needed.
    /// Re-opening an existing suite keeps its tests and hooks.
    pub fn start_suite(&self, name: &str) {
        let mut state = self.state.borrow_mut();
        state.ensure_suite(name);
        state.current_suite = Some(name.to_string());
        tracing::debug!(suite = name, "suite started");
    }

    /// Close the definition window, whatever suite it belonged to
    pub fn end_suite(&self) {
        let previous = self.state.borrow_mut().current_suite.take();
        tracing::debug!(suite = ?previous, "suite ended");
    }

    pub fn current_suite(&self) -> Option<String> {
        self.state.borrow().current_suite.clone()
    }

    /// Append a test to the active suite.
    ///
    /// With no active suite the test is not added anywhere and
    /// [`RegistryError::NoActiveSuite`] is returned.
    pub fn register_test(&self, test: TestCase) -> Result<TestRef, RegistryError> {
        match self.current_suite() {
            Some(suite) => Ok(self.register_test_in(&suite, test)),
            None => Err(orphan(RegistrationKind::Test, test.name())),
        }
    }

    pub(crate) fn register_test_in(&self, suite: &str, mut test: TestCase) -> TestRef {
        test.set_suite_name(suite);
        let test_ref = TestRef::new(suite, test.name());
        let mut state = self.state.borrow_mut();
        state.ensure_suite(suite);
        if let Some(tests) = state.suites.get_mut(suite) {
            tests.push(Rc::new(test));
        }
        tracing::debug!(suite, test = %test_ref.test_name, "test registered");
        test_ref
    }

    pub fn register_before_all<F, Fut>(&self, f: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.register_hook(HookKind::BeforeAll, hook(f))
    }

    pub fn register_after_all<F, Fut>(&self, f: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.register_hook(HookKind::AfterAll, hook(f))
    }

    /// Append a hook to the active suite, or drop it if none is active
    pub fn register_hook(&self, kind: HookKind, hook: HookFn) -> Result<(), RegistryError> {
        match self.current_suite() {
            Some(suite) => {
                self.register_hook_in(&suite, kind, hook);
                Ok(())
            }
            None => Err(orphan(kind.into(), "<hook>")),
        }
    }

    pub(crate) fn register_hook_in(&self, suite: &str, kind: HookKind, hook: HookFn) {
        let mut state = self.state.borrow_mut();
        state.ensure_suite(suite);
        if let Some(hooks) = state.hooks.get_mut(suite) {
            hooks.list_mut(kind).push(hook);
        }
        tracing::debug!(suite, ?kind, "hook registered");
    }

    /// Drop every suite, test and hook and close any open window
    pub fn clear(&self) {
        let mut state = self.state.borrow_mut();
        state.suites.clear();
        state.hooks.clear();
        state.current_suite = None;
    }

    /// All suites with their tests, in declaration order
    pub fn all_tests(&self) -> IndexMap<String, Vec<Rc<TestCase>>> {
        self.state.borrow().suites.clone()
    }

    pub fn suite_names(&self) -> Vec<String> {
        self.state.borrow().suites.keys().cloned().collect()
    }

    pub fn suite_hooks(&self, suite: &str) -> Option<SuiteHooks> {
        self.state.borrow().hooks.get(suite).cloned()
    }

    /// Resolve a test by suite, then by first matching name within the suite
    pub fn test_builder(&self, test: &TestRef) -> Option<Rc<TestCase>> {
        let state = self.state.borrow();
        state
            .suites
            .get(&test.suite_name)?
            .iter()
            .find(|t| t.name() == test.test_name)
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().suites.is_empty()
    }

    /// Capture current list sizes so later additions can be isolated
    pub fn checkpoint(&self) -> Checkpoint {
        let state = self.state.borrow();
        let sizes = state
            .suites
            .iter()
            .map(|(name, tests)| {
                let (before, after) = state
                    .hooks
                    .get(name)
                    .map(|h| (h.before_all.len(), h.after_all.len()))
                    .unwrap_or_default();
                (name.clone(), (tests.len(), before, after))
            })
            .collect();
        Checkpoint { sizes }
    }

    /// Everything registered since `checkpoint`, one plan per suite.
    ///
    /// A plan carries only the tests added since the checkpoint but the
    /// suite's full hook lists, so a re-declared suite still runs every
    /// `beforeAll` / `afterAll` it has accumulated.
    ///
    /// Suites named in `order` come first, in that order, even when nothing
    /// new was added to them. Other suites that grew follow in registry order.
    pub fn plan_since(&self, checkpoint: &Checkpoint, order: &[String]) -> Vec<SuitePlan> {
        let state = self.state.borrow();
        let mut names: Vec<&str> = Vec::new();
        for name in order {
            if state.suites.contains_key(name) && !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        for name in state.suites.keys() {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }

        names
            .into_iter()
            .filter_map(|name| {
                let (tests_from, before_from, after_from) =
                    checkpoint.sizes.get(name).copied().unwrap_or_default();
                let tests = state.suites.get(name)?;
                let hooks = state.hooks.get(name).cloned().unwrap_or_default();
                let grew = tests.len() > tests_from
                    || hooks.before_all.len() > before_from
                    || hooks.after_all.len() > after_from;
                (grew || order.iter().any(|o| o == name)).then(|| SuitePlan {
                    name: name.to_string(),
                    tests: tests.get(tests_from..).unwrap_or_default().to_vec(),
                    hooks,
                })
            })
            .collect()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Registry")
            .field("suites", &state.suites.keys().collect::<Vec<_>>())
            .field("current_suite", &state.current_suite)
            .finish()
    }
}

fn orphan(kind: RegistrationKind, name: &str) -> RegistryError {
    tracing::warn!(%kind, name, "no active suite, registration dropped");
    RegistryError::NoActiveSuite { kind }
}
