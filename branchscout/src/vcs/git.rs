use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{FetchOptions, ObjectType, ReferenceType, RemoteCallbacks, Repository, TreeWalkMode, TreeWalkResult};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use super::{GrepHit, RefEntry, RefKind, VersionControl, WorkingCopy};
use crate::cancel::Deadline;
use crate::errors::{ScanError, ScanResult};

/// `git2`-backed version control
#[derive(Debug, Default, Clone, Copy)]
pub struct GitBackend;

impl GitBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Fetch options whose transfer callbacks abort once the deadline is exhausted
fn fetch_options(deadline: &Deadline) -> FetchOptions<'_> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.transfer_progress(move |progress| {
        trace!(
            "Received {}/{} objects",
            progress.received_objects(),
            progress.total_objects()
        );
        !deadline.is_exhausted()
    });
    callbacks.sideband_progress(move |_| !deadline.is_exhausted());

    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    options
}

impl VersionControl for GitBackend {
    fn clone_repository(
        &self,
        url: &str,
        dest: &Path,
        deadline: &Deadline,
    ) -> ScanResult<Box<dyn WorkingCopy>> {
        debug!("Cloning {} into {}", url, dest.display());
        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options(deadline));
        match builder.clone(url, dest) {
            Ok(repo) => Ok(Box::new(GitWorkingCopy::new(repo, dest))),
            Err(e) => Err(deadline
                .interruption()
                .unwrap_or_else(|| ScanError::clone_failed(url, e.message()))),
        }
    }

    fn open_repository(&self, path: &Path) -> ScanResult<Box<dyn WorkingCopy>> {
        debug!("Opening existing working copy at {}", path.display());
        let repo =
            Repository::open(path).map_err(|e| ScanError::open_failed(path, e.message()))?;
        Ok(Box::new(GitWorkingCopy::new(repo, path)))
    }
}

/// A working copy opened through `git2`
pub struct GitWorkingCopy {
    repo: Repository,
    path: PathBuf,
}

impl std::fmt::Debug for GitWorkingCopy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitWorkingCopy")
            .field("path", &self.path)
            .finish()
    }
}

impl GitWorkingCopy {
    fn new(repo: Repository, path: &Path) -> Self {
        Self {
            repo,
            path: path.to_path_buf(),
        }
    }
}

fn classify(reference: &git2::Reference<'_>) -> RefKind {
    if reference.kind() == Some(ReferenceType::Symbolic) {
        RefKind::Symbolic
    } else if reference.is_remote() {
        RefKind::RemoteBranch
    } else if reference.is_branch() {
        RefKind::LocalBranch
    } else if reference.is_tag() {
        RefKind::Tag
    } else {
        RefKind::Other
    }
}

impl WorkingCopy for GitWorkingCopy {
    fn references(&self) -> ScanResult<Vec<RefEntry>> {
        let references = self
            .repo
            .references()
            .map_err(|e| ScanError::branch_enumeration(e.message()))?;

        let mut entries = Vec::new();
        for reference in references {
            let reference = reference.map_err(|e| ScanError::branch_enumeration(e.message()))?;
            // Names that are not valid UTF-8 cannot be reported anyway
            if let Some(name) = reference.name() {
                entries.push(RefEntry::new(name, classify(&reference)));
            }
        }
        Ok(entries)
    }

    fn update(&mut self, remote: &str, deadline: &Deadline) -> ScanResult<()> {
        let mut handle = self
            .repo
            .find_remote(remote)
            .map_err(|e| ScanError::update_failed(remote, e.message()))?;
        let mut options = fetch_options(deadline);
        match handle.fetch(&[] as &[&str], Some(&mut options), None) {
            Ok(()) => Ok(()),
            Err(e) => Err(deadline
                .interruption()
                .unwrap_or_else(|| ScanError::update_failed(remote, e.message()))),
        }
    }

    fn checkout(&mut self, reference: &str) -> ScanResult<()> {
        let commit = self
            .repo
            .find_reference(reference)
            .and_then(|r| r.peel_to_commit())
            .map_err(|e| ScanError::checkout_failed(reference, e.message()))?;

        self.repo
            .checkout_tree(
                commit.as_object(),
                Some(CheckoutBuilder::new().force().remove_untracked(true)),
            )
            .map_err(|e| ScanError::checkout_failed(reference, e.message()))?;
        self.repo
            .set_head_detached(commit.id())
            .map_err(|e| ScanError::checkout_failed(reference, e.message()))?;

        debug!("Checked out {} at {}", reference, commit.id());
        Ok(())
    }

    fn grep(&self, pattern: &Regex, deadline: &Deadline) -> ScanResult<Vec<GrepHit>> {
        let tree = self
            .repo
            .head()
            .and_then(|head| head.peel_to_tree())
            .map_err(|e| ScanError::search_failed(format!("No tree at HEAD: {}", e.message())))?;

        let mut hits = Vec::new();
        let mut failure: Option<ScanError> = None;

        let walked = tree.walk(TreeWalkMode::PreOrder, |root, entry| {
            if let Some(err) = deadline.interruption() {
                failure = Some(err);
                return TreeWalkResult::Abort;
            }
            if entry.kind() != Some(ObjectType::Blob) {
                return TreeWalkResult::Ok;
            }
            let Some(name) = entry.name() else {
                return TreeWalkResult::Ok;
            };

            let blob = match self.repo.find_blob(entry.id()) {
                Ok(blob) => blob,
                Err(e) => {
                    failure = Some(ScanError::search_failed(format!(
                        "Cannot read {}{}: {}",
                        root,
                        name,
                        e.message()
                    )));
                    return TreeWalkResult::Abort;
                }
            };
            if blob.is_binary() {
                trace!("Skipping binary file {}{}", root, name);
                return TreeWalkResult::Ok;
            }

            let content = String::from_utf8_lossy(blob.content());
            let path = format!("{}{}", root, name);
            for (index, line) in content.lines().enumerate() {
                if pattern.is_match(line) {
                    hits.push(GrepHit {
                        path: path.clone(),
                        line_number: index + 1,
                        content: line.to_string(),
                    });
                }
            }
            TreeWalkResult::Ok
        });

        if let Some(err) = failure {
            return Err(err);
        }
        walked.map_err(|e| ScanError::search_failed(e.message()))?;

        trace!("Pattern {} matched {} lines", pattern, hits.len());
        Ok(hits)
    }
}
