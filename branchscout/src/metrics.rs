use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Counters shared by every worker of a scan
#[derive(Debug, Clone, Default)]
pub struct ScanMetrics {
    repositories_searched: Arc<AtomicU64>,
    repositories_skipped: Arc<AtomicU64>,
    repositories_timed_out: Arc<AtomicU64>,
    branches_searched: Arc<AtomicU64>,
    branches_skipped: Arc<AtomicU64>,
    matches: Arc<AtomicU64>,
}

impl ScanMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a repository whose branches were all visited
    pub fn record_repository_searched(&self, matches: usize) {
        self.repositories_searched.fetch_add(1, Ordering::Relaxed);
        self.matches.fetch_add(matches as u64, Ordering::Relaxed);
    }

    /// Records a repository that contributed no results
    pub fn record_repository_skipped(&self, timed_out: bool) {
        self.repositories_skipped.fetch_add(1, Ordering::Relaxed);
        if timed_out {
            self.repositories_timed_out.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_branch_searched(&self) {
        self.branches_searched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_branch_skipped(&self) {
        self.branches_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ScanStats {
        ScanStats {
            repositories_searched: self.repositories_searched.load(Ordering::Relaxed),
            repositories_skipped: self.repositories_skipped.load(Ordering::Relaxed),
            repositories_timed_out: self.repositories_timed_out.load(Ordering::Relaxed),
            branches_searched: self.branches_searched.load(Ordering::Relaxed),
            branches_skipped: self.branches_skipped.load(Ordering::Relaxed),
            matches: self.matches.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.snapshot();
        info!(
            "Scan stats:\n\
             Repositories searched/skipped (timed out): {}/{} ({})\n\
             Branches searched/skipped: {}/{}\n\
             Matches: {}",
            stats.repositories_searched,
            stats.repositories_skipped,
            stats.repositories_timed_out,
            stats.branches_searched,
            stats.branches_skipped,
            stats.matches
        );
    }
}

/// Point-in-time copy of [`ScanMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub repositories_searched: u64,
    pub repositories_skipped: u64,
    pub repositories_timed_out: u64,
    pub branches_searched: u64,
    pub branches_skipped: u64,
    pub matches: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_tracking() {
        let metrics = ScanMetrics::new();

        metrics.record_repository_searched(3);
        metrics.record_repository_searched(0);
        metrics.record_repository_skipped(false);
        metrics.record_repository_skipped(true);

        let stats = metrics.snapshot();
        assert_eq!(stats.repositories_searched, 2);
        assert_eq!(stats.repositories_skipped, 2);
        assert_eq!(stats.repositories_timed_out, 1);
        assert_eq!(stats.matches, 3);
    }

    #[test]
    fn test_branch_tracking() {
        let metrics = ScanMetrics::new();

        metrics.record_branch_searched();
        metrics.record_branch_searched();
        metrics.record_branch_skipped();

        let stats = metrics.snapshot();
        assert_eq!(stats.branches_searched, 2);
        assert_eq!(stats.branches_skipped, 1);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = ScanMetrics::new();
        let worker = metrics.clone();
        worker.record_branch_skipped();
        assert_eq!(metrics.snapshot().branches_skipped, 1);
    }
}
