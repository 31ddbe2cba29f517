//! Version-control primitives the scanner is built on.
//!
//! The scanner never talks to git directly. It sequences the primitives below:
//! clone or open a working copy, list its references, update it, check out a
//! branch and search the checked-out tree. [`git::GitBackend`] implements them
//! with `git2`.

pub mod git;

#[cfg(test)]
pub(crate) mod fake;

use regex::Regex;
use std::path::Path;

use crate::cancel::Deadline;
use crate::errors::ScanResult;

pub use git::GitBackend;

/// Structural kind of a reference, as declared by the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    LocalBranch,
    RemoteBranch,
    Tag,
    Symbolic,
    Other,
}

/// One entry of a repository's reference listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefEntry {
    /// Full reference name, e.g. `refs/remotes/origin/main`
    pub name: String,
    pub kind: RefKind,
}

impl RefEntry {
    pub fn new(name: impl Into<String>, kind: RefKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A matching line found in the checked-out tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrepHit {
    /// Path relative to the repository root, `/`-separated
    pub path: String,
    /// 1-based line number
    pub line_number: usize,
    /// Line text without its terminator
    pub content: String,
}

/// Creates working copies
pub trait VersionControl: Send + Sync {
    /// Clones `url` into `dest`
    fn clone_repository(
        &self,
        url: &str,
        dest: &Path,
        deadline: &Deadline,
    ) -> ScanResult<Box<dyn WorkingCopy>>;

    /// Opens an existing working copy at `path`
    fn open_repository(&self, path: &Path) -> ScanResult<Box<dyn WorkingCopy>>;
}

/// A local working copy owned by a single worker
pub trait WorkingCopy {
    /// Every reference in listing order
    fn references(&self) -> ScanResult<Vec<RefEntry>>;

    /// Brings remote-tracking references up to date with `remote`
    fn update(&mut self, remote: &str, deadline: &Deadline) -> ScanResult<()>;

    /// Makes `reference` the checked-out tree
    fn checkout(&mut self, reference: &str) -> ScanResult<()>;

    /// Searches every file of the checked-out tree, line by line
    fn grep(&self, pattern: &Regex, deadline: &Deadline) -> ScanResult<Vec<GrepHit>>;
}
