use std::collections::HashSet;
use tracing::debug;

use crate::errors::{ScanError, ScanResult};
use crate::vcs::{RefKind, WorkingCopy};

/// A remote-tracking branch, identified by its full reference name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchRef {
    name: String,
}

impl BranchRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Full reference name, e.g. `refs/remotes/origin/main`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without the `refs/remotes/` prefix, e.g. `origin/main`
    pub fn short_name(&self) -> &str {
        self.name
            .strip_prefix("refs/remotes/")
            .unwrap_or(&self.name)
    }
}

impl std::fmt::Display for BranchRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Lists the remote-tracking branches of `remote`, in reference-listing order.
///
/// Classification uses the kind each reference declares, so a local branch
/// named `origin-fix` or a tag under `refs/tags/origin/` is never picked up.
/// Symbolic references such as `refs/remotes/origin/HEAD` are skipped too; the
/// branch they point at is listed on its own.
pub fn remote_tracking_branches(
    copy: &dyn WorkingCopy,
    remote: &str,
) -> ScanResult<Vec<BranchRef>> {
    let prefix = format!("refs/remotes/{}/", remote);
    let references = copy.references().map_err(|e| match e {
        ScanError::BranchEnumeration(_) => e,
        other => ScanError::branch_enumeration(other),
    })?;

    let mut seen = HashSet::new();
    let branches: Vec<BranchRef> = references
        .into_iter()
        .filter(|r| r.kind == RefKind::RemoteBranch && r.name.starts_with(&prefix))
        .filter(|r| seen.insert(r.name.clone()))
        .map(|r| BranchRef::new(r.name))
        .collect();

    debug!("Total branch(es): {}", branches.len());
    Ok(branches)
}
