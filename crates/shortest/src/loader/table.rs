//! Test files defined in Rust
//!
//! [`FnLoader`] maps a file path to a function that declares that file's
//! suites. It doubles as the file list for discovery, in insertion order.

use super::TestLoader;
use crate::discovery::FileDiscovery;
use crate::error::{DiscoveryError, LoadError};
use crate::scope::Scope;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

type FileFn = Rc<dyn Fn(&Scope)>;

#[derive(Clone, Default)]
pub struct FnLoader {
    files: IndexMap<PathBuf, FileFn>,
}

impl FnLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file whose body is `declare`
    pub fn file<F>(mut self, path: impl Into<PathBuf>, declare: F) -> Self
    where
        F: Fn(&Scope) + 'static,
    {
        self.files.insert(path.into(), Rc::new(declare));
        self
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.keys().cloned().collect()
    }
}

impl TestLoader for FnLoader {
    fn load(&self, path: &Path, scope: &Scope) -> Result<(), LoadError> {
        let declare = self
            .files
            .get(path)
            .ok_or_else(|| LoadError::NotFound(path.to_path_buf()))?;
        declare(scope);
        Ok(())
    }
}

impl FileDiscovery for FnLoader {
    fn discover(&self, filter: Option<&str>) -> Result<Vec<PathBuf>, DiscoveryError> {
        self.paths().discover(filter)
    }
}
