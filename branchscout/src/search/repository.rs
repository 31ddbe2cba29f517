use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use super::branches::{remote_tracking_branches, BranchRef};
use super::matcher::CompiledTerm;
use crate::cancel::{CancelToken, Deadline};
use crate::config::ScanConfig;
use crate::errors::{ScanError, ScanResult};
use crate::metrics::ScanMetrics;
use crate::observer::ScanObserver;
use crate::results::MatchRecord;
use crate::vcs::{VersionControl, WorkingCopy};

/// Derives the local directory name of a repository: the last path segment of
/// the URL without its extension (`https://host/org/sample.git` -> `sample`)
pub fn derive_local_name(url: &str) -> ScanResult<String> {
    let segment = match url.rfind('/') {
        Some(index) => &url[index + 1..],
        None => {
            return Err(ScanError::config_error(format!(
                "Repository URL has no path separator: {}",
                url
            )))
        }
    };
    let name = match segment.rfind('.') {
        Some(index) => &segment[..index],
        None => {
            return Err(ScanError::config_error(format!(
                "Repository URL has no extension in its last segment: {}",
                url
            )))
        }
    };
    if name.is_empty() {
        return Err(ScanError::config_error(format!(
            "Repository URL yields an empty local name: {}",
            url
        )));
    }
    Ok(name.to_string())
}

/// A configured repository and where its working copy lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    pub url: String,
    pub name: String,
    pub local_path: PathBuf,
}

impl RepositoryHandle {
    pub fn new(url: &str, clone_root: &Path) -> ScanResult<Self> {
        let name = derive_local_name(url)?;
        Ok(Self {
            url: url.to_string(),
            local_path: clone_root.join(&name),
            name,
        })
    }
}

/// What one repository contributed to the run
#[derive(Debug)]
pub enum RepositoryOutcome {
    Searched {
        matches: Vec<MatchRecord>,
        branches_searched: usize,
        branches_skipped: usize,
    },
    /// Contributes no rows; the reason was already reported
    Skipped(ScanError),
}

impl RepositoryOutcome {
    pub fn into_matches(self) -> Vec<MatchRecord> {
        match self {
            Self::Searched { matches, .. } => matches,
            Self::Skipped(_) => Vec::new(),
        }
    }
}

/// Per-repository behaviour taken from the configuration
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub clean_up: bool,
    pub remote_name: String,
    pub fetch_before_checkout: bool,
    pub timeout: Duration,
}

impl SearchSettings {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            clean_up: config.clean_up_dir,
            remote_name: config.remote_name.clone(),
            fetch_before_checkout: config.fetch_before_checkout,
            timeout: config.repository_timeout,
        }
    }
}

/// Removes a working copy when dropped, whichever way processing ended
struct CleanupGuard<'a> {
    path: &'a Path,
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        debug!("Deleting clone directory: {}", self.path.display());
        if let Err(e) = remove_working_copy(self.path) {
            warn!("Failed to delete {}: {}", self.path.display(), e);
        }
    }
}

fn remove_working_copy(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Branch counts and matches of one fully processed repository
type Processed = (Vec<MatchRecord>, usize, usize);

/// Processes one repository end to end: working copy, branches, search, cleanup
#[derive(Clone)]
pub struct RepositorySearcher {
    vcs: Arc<dyn VersionControl>,
    terms: Arc<[CompiledTerm]>,
    settings: SearchSettings,
    observer: Arc<dyn ScanObserver>,
    metrics: ScanMetrics,
}

impl RepositorySearcher {
    pub fn new(
        vcs: Arc<dyn VersionControl>,
        terms: Arc<[CompiledTerm]>,
        settings: SearchSettings,
        observer: Arc<dyn ScanObserver>,
        metrics: ScanMetrics,
    ) -> Self {
        Self {
            vcs,
            terms,
            settings,
            observer,
            metrics,
        }
    }

    /// Searches every remote-tracking branch of `handle`.
    ///
    /// Repository- and branch-scoped failures are reported to the observer and
    /// absorbed. `Err` is returned only for fatal errors, after cancelling
    /// `cancel` so the other workers stop early.
    pub fn search(
        &self,
        handle: &RepositoryHandle,
        cancel: &CancelToken,
    ) -> ScanResult<RepositoryOutcome> {
        self.observer.repository_started(&handle.url);
        debug!(
            "Repository name: {}, clone directory: {}",
            handle.name,
            handle.local_path.display()
        );

        if self.settings.clean_up {
            debug!("Deleting clone directory: {}", handle.local_path.display());
            if let Err(e) = remove_working_copy(&handle.local_path) {
                warn!("Failed to delete {}: {}", handle.local_path.display(), e);
            }
        } else {
            debug!(
                "Skipping cleanup. Set cleanUpDir to 'true' to delete clone directory: {}",
                handle.local_path.display()
            );
        }

        let deadline = Deadline::after(self.settings.timeout, cancel.clone());
        match self.process_within_deadline(handle, &deadline) {
            Ok((matches, branches_searched, branches_skipped)) => {
                self.metrics.record_repository_searched(matches.len());
                self.observer
                    .repository_finished(&handle.url, matches.len());
                Ok(RepositoryOutcome::Searched {
                    matches,
                    branches_searched,
                    branches_skipped,
                })
            }
            Err(e) if e.is_fatal() => {
                cancel.cancel();
                Err(e)
            }
            Err(e) => {
                self.metrics
                    .record_repository_skipped(matches!(e, ScanError::Timeout { .. }));
                self.observer.repository_skipped(&handle.url, &e);
                Ok(RepositoryOutcome::Skipped(e))
            }
        }
    }

    /// Runs [`Self::process`] on its own thread and waits at most until the
    /// deadline.
    ///
    /// libgit2 blocks without calling back while a remote stays silent, so the
    /// deadline checks inside the processing cannot fire. On expiry the thread
    /// is abandoned; it stops at its next checkpoint, if it ever reaches one,
    /// and removes its working copy when cleanup is enabled.
    fn process_within_deadline(
        &self,
        handle: &RepositoryHandle,
        deadline: &Deadline,
    ) -> ScanResult<Processed> {
        let (sender, receiver) = mpsc::channel();
        let searcher = self.clone();
        let owned = handle.clone();
        let thread_deadline = deadline.clone();
        thread::Builder::new()
            .name(format!("branchscout-repo-{}", handle.name))
            .spawn(move || {
                let processed = {
                    let _cleanup = searcher.settings.clean_up.then(|| CleanupGuard {
                        path: &owned.local_path,
                    });
                    searcher.process(&owned, &thread_deadline)
                };
                // The receiver is gone when the deadline already passed
                let _ = sender.send(processed);
            })?;

        match receiver.recv_timeout(deadline.remaining()) {
            Ok(processed) => processed,
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Abandoning {} after {}",
                    handle.url,
                    humantime::format_duration(self.settings.timeout)
                );
                if self.settings.clean_up {
                    if let Err(e) = remove_working_copy(&handle.local_path) {
                        debug!("Failed to delete {}: {}", handle.local_path.display(), e);
                    }
                }
                Err(deadline
                    .interruption()
                    .unwrap_or_else(|| ScanError::timeout(self.settings.timeout)))
            }
            Err(RecvTimeoutError::Disconnected) => Err(ScanError::search_failed(format!(
                "Worker for {} exited without a result",
                handle.url
            ))),
        }
    }

    fn process(&self, handle: &RepositoryHandle, deadline: &Deadline) -> ScanResult<Processed> {
        let mut copy = self.working_copy(handle, deadline)?;
        deadline.check()?;

        let branches = remote_tracking_branches(copy.as_ref(), &self.settings.remote_name)?;
        info!(
            "Branches of {}: {:?}",
            handle.url,
            branches.iter().map(BranchRef::short_name).collect::<Vec<_>>()
        );

        let mut matches = Vec::new();
        let mut searched = 0;
        let mut skipped = 0;
        for branch in &branches {
            deadline.check()?;
            if self.settings.fetch_before_checkout {
                if let Err(e) = copy.update(&self.settings.remote_name, deadline) {
                    if e.is_interruption() {
                        return Err(e);
                    }
                    debug!("Continuing without update: {}", e);
                }
            }

            debug!("Checking out branch: {}", branch);
            if let Err(e) = copy.checkout(branch.name()) {
                self.metrics.record_branch_skipped();
                self.observer.branch_skipped(&handle.url, branch.name(), &e);
                skipped += 1;
                continue;
            }

            matches.extend(self.search_branch(copy.as_ref(), handle, branch, deadline)?);
            self.metrics.record_branch_searched();
            searched += 1;
        }

        Ok((matches, searched, skipped))
    }

    /// Clones a fresh copy, falling back to an existing one at the same path
    fn working_copy(
        &self,
        handle: &RepositoryHandle,
        deadline: &Deadline,
    ) -> ScanResult<Box<dyn WorkingCopy>> {
        match self
            .vcs
            .clone_repository(&handle.url, &handle.local_path, deadline)
        {
            Ok(copy) => Ok(copy),
            Err(e) if e.is_interruption() => Err(e),
            Err(e) => {
                debug!("Clone failed, trying existing working copy: {}", e);
                self.vcs.open_repository(&handle.local_path)
            }
        }
    }

    fn search_branch(
        &self,
        copy: &dyn WorkingCopy,
        handle: &RepositoryHandle,
        branch: &BranchRef,
        deadline: &Deadline,
    ) -> ScanResult<Vec<MatchRecord>> {
        let mut records = Vec::new();
        for term in self.terms.iter() {
            deadline.check()?;
            trace!("Searching {} for term: {}", branch, term.term);
            let hits = copy.grep(&term.pattern, deadline)?;
            records.extend(hits.into_iter().map(|hit| MatchRecord {
                repository: handle.url.clone(),
                branch: branch.name().to_string(),
                term: term.term.clone(),
                path: hit.path,
                line_number: hit.line_number,
                content: hit.content,
            }));
        }
        Ok(records)
    }
}
