//! Test discovery - find test files under a directory

use crate::error::DiscoveryError;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Produces the ordered list of test files for a run
pub trait FileDiscovery {
    /// `filter` narrows the result; see [`PathFilter`] for its syntax
    fn discover(&self, filter: Option<&str>) -> Result<Vec<PathBuf>, DiscoveryError>;
}

impl FileDiscovery for Vec<PathBuf> {
    fn discover(&self, filter: Option<&str>) -> Result<Vec<PathBuf>, DiscoveryError> {
        let filter = filter.map(PathFilter::new).transpose()?;
        Ok(self
            .iter()
            .filter(|p| filter.as_ref().map_or(true, |f| f.matches(&slash_path(p))))
            .cloned()
            .collect())
    }
}

/// Walks a directory tree for files whose relative path matches a glob
#[derive(Debug, Clone)]
pub struct PatternDiscovery {
    root: PathBuf,
    pattern: String,
}

impl PatternDiscovery {
    pub fn new(root: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            pattern: pattern.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileDiscovery for PatternDiscovery {
    fn discover(&self, filter: Option<&str>) -> Result<Vec<PathBuf>, DiscoveryError> {
        let pattern = glob_to_regex(&self.pattern)?;
        let filter = filter.map(PathFilter::new).transpose()?;
        let mut files = Vec::new();

        // Sorted walk for a deterministic file order
        for entry in WalkDir::new(&self.root).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|error| DiscoveryError::Walk {
                root: self.root.clone(),
                error,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            let relative = slash_path(relative);
            if pattern.is_match(&relative)
                && filter.as_ref().map_or(true, |f| f.matches(&relative))
            {
                files.push(entry.path().to_path_buf());
            }
        }

        tracing::debug!(root = %self.root.display(), count = files.len(), "discovered test files");
        Ok(files)
    }
}

/// Narrowing filter for discovered paths.
///
/// A filter containing `*` or `?` is a glob over the whole relative path;
/// anything else matches as a substring.
#[derive(Debug, Clone)]
pub enum PathFilter {
    Glob(Regex),
    Contains(String),
}

impl PathFilter {
    pub fn new(filter: &str) -> Result<Self, DiscoveryError> {
        if filter.contains(['*', '?']) {
            Ok(PathFilter::Glob(glob_to_regex(filter)?))
        } else {
            Ok(PathFilter::Contains(filter.to_string()))
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathFilter::Glob(re) => re.is_match(path),
            PathFilter::Contains(needle) => path.contains(needle.as_str()),
        }
    }
}

/// Translate a glob (`**`, `*`, `?`) into an anchored regex over `/` paths
pub fn glob_to_regex(glob: &str) -> Result<Regex, DiscoveryError> {
    let chars: Vec<char> = glob.chars().collect();
    let mut re = String::from("^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                if chars.get(i) == Some(&'/') {
                    i += 1;
                    re.push_str("(?:.*/)?");
                } else {
                    re.push_str(".*");
                }
                continue;
            }
            '*' => re.push_str("[^/]*"),
            '?' => re.push_str("[^/]"),
            c => re.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
        i += 1;
    }
    re.push('$');

    Regex::new(&re).map_err(|error| DiscoveryError::InvalidPattern {
        pattern: glob.to_string(),
        error,
    })
}

fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
