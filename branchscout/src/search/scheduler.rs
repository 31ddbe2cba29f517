use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, info};

use super::repository::{RepositoryHandle, RepositoryOutcome, RepositorySearcher};
use crate::cancel::CancelToken;
use crate::errors::{ScanError, ScanResult};
use crate::observer::ScanObserver;
use crate::results::MatchRecord;

/// Splits `items` into consecutive windows of at most `size` entries
pub fn partition_windows<T>(items: &[T], size: NonZeroUsize) -> std::slice::Chunks<'_, T> {
    items.chunks(size.get())
}

/// Runs one [`RepositorySearcher`] per repository, a window at a time.
///
/// Repositories within a window run in parallel on a pool with exactly
/// `concurrency` threads. The next window starts only once every repository of
/// the current one has finished. Each worker returns its own match list; lists
/// are merged on the calling thread after the window completes, so no worker
/// touches shared results.
pub struct BatchScheduler {
    concurrency: NonZeroUsize,
    pool: ThreadPool,
    observer: Arc<dyn ScanObserver>,
}

impl BatchScheduler {
    pub fn new(concurrency: NonZeroUsize, observer: Arc<dyn ScanObserver>) -> ScanResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(concurrency.get())
            .thread_name(|index| format!("branchscout-worker-{}", index))
            .build()
            .map_err(|e| ScanError::config_error(format!("Failed to start worker pool: {}", e)))?;
        Ok(Self {
            concurrency,
            pool,
            observer,
        })
    }

    /// Processes every repository and returns the per-window match lists.
    ///
    /// A fatal error from any worker cancels `cancel`, lets the rest of the
    /// window wind down and is returned once the window's barrier is reached.
    pub fn run(
        &self,
        repositories: &[RepositoryHandle],
        searcher: &RepositorySearcher,
        cancel: &CancelToken,
    ) -> ScanResult<Vec<Vec<MatchRecord>>> {
        let total = repositories.len().div_ceil(self.concurrency.get());
        info!(
            "Searching {} repos in {} windows of up to {}",
            repositories.len(),
            total,
            self.concurrency
        );

        let mut merged = Vec::with_capacity(total);
        for (index, window) in partition_windows(repositories, self.concurrency).enumerate() {
            let urls: Vec<String> = window.iter().map(|h| h.url.clone()).collect();
            self.observer.window_started(index, total, &urls);

            let outcomes: Vec<ScanResult<RepositoryOutcome>> = self.pool.install(|| {
                window
                    .par_iter()
                    .with_max_len(1)
                    .map(|handle| searcher.search(handle, cancel))
                    .collect()
            });

            self.observer.window_finished(index, total);

            let mut window_matches = Vec::new();
            for outcome in outcomes {
                window_matches.extend(outcome?.into_matches());
            }
            debug!("Window {} produced {} matches", index + 1, window_matches.len());
            merged.push(window_matches);
        }
        Ok(merged)
    }
}
