use tracing::{info, warn};

use crate::errors::ScanError;

/// Receives progress events from a running scan.
///
/// Events for different repositories arrive from different worker threads.
/// Every method defaults to doing nothing.
pub trait ScanObserver: Send + Sync {
    /// A window of repositories is about to be processed
    fn window_started(&self, _index: usize, _total: usize, _repositories: &[String]) {}

    /// Every repository of the window has finished
    fn window_finished(&self, _index: usize, _total: usize) {}

    fn repository_started(&self, _url: &str) {}

    /// The repository contributes no results
    fn repository_skipped(&self, _url: &str, _reason: &ScanError) {}

    /// One branch could not be checked out; the others are still searched
    fn branch_skipped(&self, _url: &str, _branch: &str, _reason: &ScanError) {}

    fn repository_finished(&self, _url: &str, _matches: usize) {}
}

/// Ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ScanObserver for NullObserver {}

/// Logs every event through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ScanObserver for TracingObserver {
    fn window_started(&self, index: usize, total: usize, repositories: &[String]) {
        info!(
            "Starting window {}/{} with {} repositories",
            index + 1,
            total,
            repositories.len()
        );
    }

    fn window_finished(&self, index: usize, total: usize) {
        info!("Finished window {}/{}", index + 1, total);
    }

    fn repository_started(&self, url: &str) {
        info!("Searching repo: {}", url);
    }

    fn repository_skipped(&self, url: &str, reason: &ScanError) {
        warn!("Skipping repo {}: {}", url, reason);
    }

    fn branch_skipped(&self, url: &str, branch: &str, reason: &ScanError) {
        warn!("Skipping branch {} of {}: {}", branch, url, reason);
    }

    fn repository_finished(&self, url: &str, matches: usize) {
        info!("Finished repo {} with {} matches", url, matches);
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Event {
        WindowStarted(usize),
        WindowFinished(usize),
        Started(String),
        Skipped(String),
        BranchSkipped(String, String),
        Finished(String, usize),
    }

    /// Keeps every event in arrival order
    #[derive(Debug, Default)]
    pub struct RecordingObserver {
        events: Mutex<Vec<Event>>,
    }

    impl RecordingObserver {
        pub fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl ScanObserver for RecordingObserver {
        fn window_started(&self, index: usize, _total: usize, _repositories: &[String]) {
            self.push(Event::WindowStarted(index));
        }

        fn window_finished(&self, index: usize, _total: usize) {
            self.push(Event::WindowFinished(index));
        }

        fn repository_started(&self, url: &str) {
            self.push(Event::Started(url.to_string()));
        }

        fn repository_skipped(&self, url: &str, _reason: &ScanError) {
            self.push(Event::Skipped(url.to_string()));
        }

        fn branch_skipped(&self, url: &str, branch: &str, _reason: &ScanError) {
            self.push(Event::BranchSkipped(url.to_string(), branch.to_string()));
        }

        fn repository_finished(&self, url: &str, matches: usize) {
            self.push(Event::Finished(url.to_string(), matches));
        }
    }
}
