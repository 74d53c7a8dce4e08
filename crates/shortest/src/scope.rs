//! Declaration capabilities handed to test files
//!
//! A [`Scope`] is what a test file sees while it is being loaded: `define`,
//! `before_all`, `after_all`, `test` and `expect`. It replaces ambient
//! globals with an explicit object bound to one [`Registry`].
//!
//! `define` opens the suite immediately, calls the body, and returns a
//! [`Registration`] handle that completes once the body's future has finished
//! and the suite window has been closed. The scope keeps a clone of every
//! handle so the runner can wait for all of them with [`Scope::settle`] before
//! it executes anything or loads the next file.

use crate::builder::{TestCase, TestRef};
use crate::error::RegistryError;
use crate::expect::{expect, Expectation};
use crate::registry::{hook, HookKind, Registry};
use futures_util::future::{FutureExt, LocalBoxFuture, Shared};
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

/// Completes when a suite's body has finished registering
pub type Registration = Shared<LocalBoxFuture<'static, ()>>;

#[derive(Default)]
struct ScopeState {
    pending: Vec<Registration>,
    defined: Vec<String>,
}

/// File-level declaration capabilities
#[derive(Clone)]
pub struct Scope {
    registry: Registry,
    state: Rc<RefCell<ScopeState>>,
}

impl Scope {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            state: Rc::default(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Declare a suite.
    ///
    /// Anything the body registers synchronously lands in `name`. Work the body
    /// does after its first suspension point still targets `name` when it goes
    /// through the [`SuiteScope`] it was given; registrations through the
    /// file-level [`Scope`] follow whichever suite is active at that moment.
    pub fn define<F, Fut>(&self, name: &str, body: F) -> Registration
    where
        F: FnOnce(SuiteScope) -> Fut,
        Fut: Future<Output = ()> + 'static,
    {
        self.registry.start_suite(name);
        {
            let mut state = self.state.borrow_mut();
            if !state.defined.iter().any(|d| d == name) {
                state.defined.push(name.to_string());
            }
        }

        let work = body(SuiteScope {
            registry: self.registry.clone(),
            suite: name.to_string(),
        });

        let registry = self.registry.clone();
        let suite = name.to_string();
        let registration = async move {
            work.await;
            registry.end_suite();
            tracing::debug!(suite = %suite, "suite registration complete");
        }
        .boxed_local()
        .shared();

        self.state.borrow_mut().pending.push(registration.clone());
        registration
    }

    /// Register a `beforeAll` hook on the active suite
    pub fn before_all<F, Fut>(&self, f: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.registry.register_hook(HookKind::BeforeAll, hook(f))
    }

    /// Register an `afterAll` hook on the active suite
    pub fn after_all<F, Fut>(&self, f: F) -> Result<(), RegistryError>
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.registry.register_hook(HookKind::AfterAll, hook(f))
    }

    /// Register a test on the active suite
    pub fn test(&self, test: TestCase) -> Result<TestRef, RegistryError> {
        test.register(&self.registry)
    }

    pub fn expect<T>(&self, actual: T) -> Expectation<T> {
        expect(actual)
    }

    /// Wait for every `define` issued through this scope, including ones issued
    /// while waiting, to finish registering.
    pub async fn settle(&self) {
        let mut index = 0;
        loop {
            let next = self.state.borrow().pending.get(index).cloned();
            match next {
                Some(registration) => {
                    registration.await;
                    index += 1;
                }
                None => break,
            }
        }
    }

    /// Suites declared through this scope, in first-declaration order
    pub fn defined_suites(&self) -> Vec<String> {
        self.state.borrow().defined.clone()
    }
}

/// Declaration capabilities bound to one suite
#[derive(Clone)]
pub struct SuiteScope {
    registry: Registry,
    suite: String,
}

impl SuiteScope {
    pub fn name(&self) -> &str {
        &self.suite
    }

    pub fn test(&self, test: TestCase) -> TestRef {
        self.registry.register_test_in(&self.suite, test)
    }

    pub fn before_all<F, Fut>(&self, f: F)
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.registry
            .register_hook_in(&self.suite, HookKind::BeforeAll, hook(f));
    }

    pub fn after_all<F, Fut>(&self, f: F)
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.registry
            .register_hook_in(&self.suite, HookKind::AfterAll, hook(f));
    }

    pub fn expect<T>(&self, actual: T) -> Expectation<T> {
        expect(actual)
    }
}
