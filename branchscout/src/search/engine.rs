use std::fs;
use std::sync::Arc;
use tracing::{debug, info};

use super::matcher::compile_terms;
use super::repository::{RepositoryHandle, RepositorySearcher, SearchSettings};
use super::scheduler::BatchScheduler;
use crate::cancel::CancelToken;
use crate::config::ScanConfig;
use crate::errors::{ScanError, ScanResult};
use crate::metrics::ScanMetrics;
use crate::observer::ScanObserver;
use crate::report::write_csv;
use crate::results::ScanReport;
use crate::vcs::{GitBackend, VersionControl};

/// Scans every configured repository and returns the merged matches.
///
/// Patterns are compiled and repository names derived before any repository
/// is touched, so configuration problems fail the run up front.
pub fn scan(
    config: &ScanConfig,
    vcs: Arc<dyn VersionControl>,
    observer: Arc<dyn ScanObserver>,
) -> ScanResult<ScanReport> {
    info!(
        "Starting scan of {} repos for terms: {:?}",
        config.repositories.len(),
        config.search_terms
    );

    let terms = compile_terms(config)?;
    let handles = config
        .repositories
        .iter()
        .map(|url| RepositoryHandle::new(url, &config.clone_dir))
        .collect::<ScanResult<Vec<_>>>()?;

    fs::create_dir_all(&config.clone_dir).map_err(|e| {
        ScanError::config_error(format!(
            "Cannot create clone directory {}: {}",
            config.clone_dir.display(),
            e
        ))
    })?;

    let metrics = ScanMetrics::new();
    let searcher = RepositorySearcher::new(
        vcs,
        terms,
        SearchSettings::from_config(config),
        observer.clone(),
        metrics.clone(),
    );
    let scheduler = BatchScheduler::new(config.concurrent_searches, observer)?;
    let windows = scheduler.run(&handles, &searcher, &CancelToken::new())?;

    metrics.log_stats();
    let report = ScanReport::from_windows(windows, metrics.snapshot());
    info!("Scan complete. Found {} matches", report.len());
    Ok(report)
}

/// Scans with the git backend and writes the CSV report when anything matched
pub fn run(config: &ScanConfig, observer: Arc<dyn ScanObserver>) -> ScanResult<ScanReport> {
    let report = scan(config, Arc::new(GitBackend::new()), observer)?;
    if report.is_empty() {
        info!("No results found.");
    } else {
        debug!("Writing {} rows to {}", report.len() + 1, config.output_file.display());
        write_csv(&report, &config.output_file)?;
    }
    Ok(report)
}
