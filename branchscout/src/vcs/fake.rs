//! In-memory version control for unit tests.

use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{GrepHit, RefEntry, RefKind, VersionControl, WorkingCopy};
use crate::cancel::Deadline;
use crate::errors::{ScanError, ScanResult};

/// Scripted behaviour of one fake remote
#[derive(Debug, Clone, Default)]
pub struct FakeRepo {
    pub refs: Vec<RefEntry>,
    /// Files per reference name: (path, content)
    pub files: HashMap<String, Vec<(String, String)>>,
    pub fail_clone: bool,
    pub fail_references: bool,
    pub fail_update: bool,
    pub fail_grep: bool,
    pub unreadable_branches: Vec<String>,
    /// Time spent inside clone, to observe overlap between workers
    pub clone_delay: Duration,
}

impl FakeRepo {
    pub fn with_branch(mut self, branch: &str, files: &[(&str, &str)]) -> Self {
        let name = format!("refs/remotes/origin/{}", branch);
        self.refs.push(RefEntry::new(&name, RefKind::RemoteBranch));
        self.files.insert(
            name,
            files
                .iter()
                .map(|(p, c)| (p.to_string(), c.to_string()))
                .collect(),
        );
        self
    }
}

/// Backend that serves [`FakeRepo`]s keyed by URL.
///
/// Cloning creates the destination directory so cleanup can be observed, and an
/// "existing working copy" is any directory registered with [`FakeBackend::with_existing`].
#[derive(Debug, Default)]
pub struct FakeBackend {
    repos: HashMap<String, FakeRepo>,
    existing: Mutex<HashMap<std::path::PathBuf, String>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    clones: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(mut self, url: &str, repo: FakeRepo) -> Self {
        self.repos.insert(url.to_string(), repo);
        self
    }

    /// Registers a directory as an already cloned copy of `url`
    pub fn with_existing(self, path: &Path, url: &str) -> Self {
        self.existing
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), url.to_string());
        self
    }

    /// Highest number of working copies alive at the same time
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn clone_attempts(&self) -> usize {
        self.clones.load(Ordering::SeqCst)
    }

    fn working_copy(&self, url: &str) -> Box<dyn WorkingCopy> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Box::new(FakeWorkingCopy {
            repo: self.repos.get(url).cloned().unwrap_or_default(),
            checked_out: None,
            active: self.active.clone(),
        })
    }
}

impl VersionControl for FakeBackend {
    fn clone_repository(
        &self,
        url: &str,
        dest: &Path,
        deadline: &Deadline,
    ) -> ScanResult<Box<dyn WorkingCopy>> {
        self.clones.fetch_add(1, Ordering::SeqCst);
        let repo = self
            .repos
            .get(url)
            .ok_or_else(|| ScanError::clone_failed(url, "unknown remote"))?;
        if repo.fail_clone {
            return Err(ScanError::clone_failed(url, "remote unreachable"));
        }
        if dest.exists() {
            return Err(ScanError::clone_failed(url, "destination already exists"));
        }
        let copy = self.working_copy(url);
        std::thread::sleep(repo.clone_delay);
        deadline.check()?;
        fs::create_dir_all(dest)?;
        self.existing
            .lock()
            .unwrap()
            .insert(dest.to_path_buf(), url.to_string());
        Ok(copy)
    }

    fn open_repository(&self, path: &Path) -> ScanResult<Box<dyn WorkingCopy>> {
        let url = self.existing.lock().unwrap().get(path).cloned();
        match url {
            Some(url) if path.exists() => Ok(self.working_copy(&url)),
            _ => Err(ScanError::open_failed(path, "not a repository")),
        }
    }
}

struct FakeWorkingCopy {
    repo: FakeRepo,
    checked_out: Option<String>,
    active: Arc<AtomicUsize>,
}

impl Drop for FakeWorkingCopy {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl WorkingCopy for FakeWorkingCopy {
    fn references(&self) -> ScanResult<Vec<RefEntry>> {
        if self.repo.fail_references {
            return Err(ScanError::branch_enumeration("corrupt reference store"));
        }
        Ok(self.repo.refs.clone())
    }

    fn update(&mut self, remote: &str, _deadline: &Deadline) -> ScanResult<()> {
        if self.repo.fail_update {
            return Err(ScanError::update_failed(remote, "offline"));
        }
        Ok(())
    }

    fn checkout(&mut self, reference: &str) -> ScanResult<()> {
        if self.repo.unreadable_branches.iter().any(|b| b == reference)
            || !self.repo.files.contains_key(reference)
        {
            return Err(ScanError::checkout_failed(reference, "cannot check out"));
        }
        self.checked_out = Some(reference.to_string());
        Ok(())
    }

    fn grep(&self, pattern: &Regex, deadline: &Deadline) -> ScanResult<Vec<GrepHit>> {
        deadline.check()?;
        if self.repo.fail_grep {
            return Err(ScanError::search_failed("object database unreadable"));
        }
        let files = self
            .checked_out
            .as_ref()
            .and_then(|r| self.repo.files.get(r))
            .cloned()
            .unwrap_or_default();
        let mut hits = Vec::new();
        for (path, content) in files {
            for (index, line) in content.lines().enumerate() {
                if pattern.is_match(line) {
                    hits.push(GrepHit {
                        path: path.clone(),
                        line_number: index + 1,
                        content: line.to_string(),
                    });
                }
            }
        }
        Ok(hits)
    }
}
