//! Test file loading
//!
//! Loading a file means evaluating its declarations against a [`Scope`]. A
//! loader only issues `define` calls; waiting for their registrations to
//! finish is the runner's job.

pub mod declarative;
pub mod table;

pub use declarative::TomlLoader;
pub use table::FnLoader;

use crate::error::LoadError;
use crate::scope::Scope;
use std::path::Path;

/// Evaluates one test file's declarations
pub trait TestLoader {
    fn load(&self, path: &Path, scope: &Scope) -> Result<(), LoadError>;
}
