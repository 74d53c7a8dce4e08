//! Declarative test files (`*.test.toml`)
//!
//! ```toml
//! [[suite]]
//! name = "Login"
//! before_all = [{ description = "seed a user", run = "./seed.sh" }]
//!
//! [[suite.test]]
//! name = "signs in"
//!
//! [[suite.test.step]]
//! kind = "when"
//! description = "the user submits the form"
//! run = "curl -sf $SHORTEST_TARGET_URL/login"
//! ```
//!
//! Every `[[suite]]` becomes one `define` call. Keys of a step other than
//! `kind` and `description` form its opaque payload. Hook steps are run
//! through the loader's [`StepExecutor`].

use super::TestLoader;
use crate::builder::{Step, StepKind, TestCase};
use crate::error::LoadError;
use crate::scope::Scope;
use crate::step::{StepContext, StepExecutor};
use futures_util::future::{FutureExt, LocalBoxFuture};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TestFile {
    #[serde(default, rename = "suite")]
    suites: Vec<SuiteDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SuiteDef {
    name: String,
    #[serde(default)]
    before_all: Vec<StepDef>,
    #[serde(default)]
    after_all: Vec<StepDef>,
    #[serde(default, rename = "test")]
    tests: Vec<TestDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TestDef {
    name: String,
    #[serde(default, rename = "step")]
    steps: Vec<StepDef>,
}

#[derive(Debug, Deserialize)]
struct StepDef {
    #[serde(default = "default_kind")]
    kind: StepKind,
    description: String,
    #[serde(flatten)]
    payload: serde_json::Map<String, serde_json::Value>,
}

fn default_kind() -> StepKind {
    StepKind::When
}

impl StepDef {
    fn into_step(self) -> Step {
        let payload = if self.payload.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::Value::Object(self.payload)
        };
        Step::new(self.kind, self.description).with_payload(payload)
    }
}

/// Loads `*.test.toml` files
pub struct TomlLoader {
    executor: Rc<dyn StepExecutor>,
}

impl TomlLoader {
    /// `executor` runs the steps of suite hooks
    pub fn new(executor: Rc<dyn StepExecutor>) -> Self {
        Self { executor }
    }

    fn parse(path: &Path) -> Result<TestFile, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LoadError::NotFound(path.to_path_buf())
            } else {
                LoadError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let file: TestFile = toml::from_str(&content).map_err(|error| LoadError::Parse {
            path: path.to_path_buf(),
            error,
        })?;
        validate(path, &file)?;
        Ok(file)
    }

    fn hook(
        &self,
        suite: &str,
        steps: Vec<StepDef>,
    ) -> impl Fn() -> LocalBoxFuture<'static, anyhow::Result<()>> {
        let executor = Rc::clone(&self.executor);
        let steps: Rc<Vec<Step>> = Rc::new(steps.into_iter().map(StepDef::into_step).collect());
        let suite = suite.to_string();
        move || {
            let executor = Rc::clone(&executor);
            let steps = Rc::clone(&steps);
            let suite = suite.clone();
            async move {
                for (index, step) in steps.iter().enumerate() {
                    let ctx = StepContext::Hook {
                        suite: suite.clone(),
                        index,
                    };
                    executor.execute(step, &ctx).await?;
                }
                Ok::<(), anyhow::Error>(())
            }
            .boxed_local()
        }
    }
}

impl TestLoader for TomlLoader {
    fn load(&self, path: &Path, scope: &Scope) -> Result<(), LoadError> {
        let file = Self::parse(path)?;
        tracing::debug!(path = %path.display(), suites = file.suites.len(), "loaded test file");

        for suite in file.suites {
            let before_all = (!suite.before_all.is_empty())
                .then(|| self.hook(&suite.name, suite.before_all));
            let after_all = (!suite.after_all.is_empty())
                .then(|| self.hook(&suite.name, suite.after_all));
            let tests = suite.tests;

            let _registration = scope.define(&suite.name, move |s| {
                if let Some(hook) = before_all {
                    s.before_all(hook);
                }
                for test in tests {
                    let case = test
                        .steps
                        .into_iter()
                        .fold(TestCase::new(test.name), |case, step| {
                            case.step(step.into_step())
                        });
                    s.test(case);
                }
                if let Some(hook) = after_all {
                    s.after_all(hook);
                }
                async {}
            });
        }
        Ok(())
    }
}

fn validate(path: &Path, file: &TestFile) -> Result<(), LoadError> {
    let invalid = |reason: String| LoadError::Invalid {
        path: PathBuf::from(path),
        reason,
    };

    for suite in &file.suites {
        if suite.name.trim().is_empty() {
            return Err(invalid("suite name cannot be empty".to_string()));
        }
        for test in &suite.tests {
            if test.name.trim().is_empty() {
                return Err(invalid(format!(
                    "test name cannot be empty in suite '{}'",
                    suite.name
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TestError;
    use crate::registry::Registry;
    use crate::step::RecordingExecutor;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".test.toml").unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    async fn load(content: &str, executor: RecordingExecutor) -> Result<Registry, LoadError> {
        let file = write_file(content);
        let registry = Registry::new();
        let scope = Scope::new(registry.clone());
        TomlLoader::new(Rc::new(executor)).load(file.path(), &scope)?;
        scope.settle().await;
        Ok(registry)
    }

    #[tokio::test]
    async fn test_load_suites_tests_and_steps() {
        let registry = load(
            r#"
[[suite]]
name = "Login"

[[suite.test]]
name = "signs in"

[[suite.test.step]]
kind = "given"
description = "a registered user"

[[suite.test.step]]
description = "submit the form"
run = "true"

[[suite]]
name = "Cart"

[[suite.test]]
name = "adds item"
"#,
            RecordingExecutor::new(),
        )
        .await
        .unwrap();

        assert_eq!(registry.suite_names(), vec!["Login", "Cart"]);
        let tests = registry.all_tests();
        let login = &tests["Login"][0];
        assert_eq!(login.name(), "signs in");
        assert_eq!(login.suite_name(), Some("Login"));
        assert_eq!(login.steps()[0].kind, StepKind::Given);
        assert_eq!(login.steps()[0].payload, serde_json::Value::Null);
        assert_eq!(login.steps()[1].kind, StepKind::When);
        assert_eq!(login.steps()[1].payload, json!({ "run": "true" }));
        assert_eq!(registry.current_suite(), None);
    }

    #[tokio::test]
    async fn test_hooks_run_through_executor() {
        let executor = RecordingExecutor::new();
        let registry = load(
            r#"
[[suite]]
name = "Seeded"
before_all = [{ description = "seed db" }, { description = "start server" }]
after_all = [{ description = "stop server" }]
"#,
            executor.clone(),
        )
        .await
        .unwrap();

        let hooks = registry.suite_hooks("Seeded").unwrap();
        assert_eq!(hooks.before_all.len(), 1);
        assert_eq!(hooks.after_all.len(), 1);

        (hooks.before_all[0])().await.unwrap();
        (hooks.after_all[0])().await.unwrap();
        assert_eq!(executor.seen(), vec!["seed db", "start server", "stop server"]);
    }

    #[tokio::test]
    async fn test_hook_failure_is_reported() {
        let executor = RecordingExecutor::new().failing_on("seed db");
        let registry = load(
            r#"
[[suite]]
name = "Seeded"
before_all = [{ description = "seed db" }]
"#,
            executor,
        )
        .await
        .unwrap();

        let hooks = registry.suite_hooks("Seeded").unwrap();
        let err = (hooks.before_all[0])().await.unwrap_err();
        assert!(matches!(TestError::from(err), TestError::Step { .. }));
    }

    #[tokio::test]
    async fn test_invalid_files() {
        let missing = Registry::new();
        let scope = Scope::new(missing);
        let loader = TomlLoader::new(Rc::new(RecordingExecutor::new()));
        assert!(matches!(
            loader.load(Path::new("/nonexistent/x.test.toml"), &scope),
            Err(LoadError::NotFound(_))
        ));

        let err = load("[[suite]]\nname = ", RecordingExecutor::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));

        let err = load("[[suite]]\nname = \"\"", RecordingExecutor::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Invalid { .. }));

        let err = load("[[suite]]\nname = \"A\"\nunknown = 1", RecordingExecutor::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }
}
