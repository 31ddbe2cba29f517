use branchscout::{ScanError, ScanObserver, TracingObserver};
use indicatif::{ProgressBar, ProgressStyle};

/// Shows a progress bar over repositories while forwarding events to the log
pub struct ProgressObserver {
    bar: ProgressBar,
    log: TracingObserver,
}

impl ProgressObserver {
    pub fn new(repositories: usize) -> Self {
        let bar = ProgressBar::new(repositories as u64);
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} repos {msg}")
            .map(|style| style.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self {
            bar,
            log: TracingObserver,
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ScanObserver for ProgressObserver {
    fn window_started(&self, index: usize, total: usize, repositories: &[String]) {
        self.bar.set_message(format!("(window {}/{})", index + 1, total));
        self.bar
            .suspend(|| self.log.window_started(index, total, repositories));
    }

    fn window_finished(&self, index: usize, total: usize) {
        self.bar.suspend(|| self.log.window_finished(index, total));
    }

    fn repository_started(&self, url: &str) {
        self.bar.suspend(|| self.log.repository_started(url));
    }

    fn repository_skipped(&self, url: &str, reason: &ScanError) {
        self.bar.suspend(|| self.log.repository_skipped(url, reason));
        self.bar.inc(1);
    }

    fn branch_skipped(&self, url: &str, branch: &str, reason: &ScanError) {
        self.bar
            .suspend(|| self.log.branch_skipped(url, branch, reason));
    }

    fn repository_finished(&self, url: &str, matches: usize) {
        self.bar
            .suspend(|| self.log.repository_finished(url, matches));
        self.bar.inc(1);
    }
}
