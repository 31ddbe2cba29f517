/// Error types for branchscout.
///
/// Every failure a scan can hit is a [`ScanError`]. The variants fall into three
/// scopes, and [`ScanError::is_fatal`] tells the scheduler which one applies:
///
/// - **Run-scoped (fatal)**: bad configuration, an invalid search pattern, a broken
///   search primitive or an unwritable report. The run stops.
/// - **Repository-scoped**: the repository cannot be cloned or opened, its branches
///   cannot be listed, or its time budget ran out. The repository is skipped.
/// - **Branch-scoped**: a single branch cannot be checked out. Only that branch is
///   skipped.
///
/// ```rust,ignore
/// match searcher.search(&handle, &cancel) {
///     Ok(RepositoryOutcome::Searched { matches, .. }) => // merge matches,
///     Ok(RepositoryOutcome::Skipped(reason)) => // logged, batch continues,
///     Err(e) => // fatal, abort the run
/// }
/// ```
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for scan operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Errors that can occur while scanning repositories
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid pattern '{term}': {message}")]
    InvalidPattern { term: String, message: String },
    #[error("Failed to clone {url}: {message}")]
    Clone { url: String, message: String },
    #[error("Failed to open working copy at {path}: {message}")]
    Open { path: PathBuf, message: String },
    #[error("Failed to enumerate branches: {0}")]
    BranchEnumeration(String),
    #[error("Failed to check out {branch}: {message}")]
    Checkout { branch: String, message: String },
    #[error("Failed to update from remote '{remote}': {message}")]
    Update { remote: String, message: String },
    #[error("Search failed: {0}")]
    Search(String),
    #[error("Timed out after {limit}")]
    Timeout { limit: humantime::Duration },
    #[error("Scan cancelled")]
    Cancelled,
    #[error("Failed to write report to {path}: {message}")]
    Write { path: PathBuf, message: String },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ScanError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_pattern(term: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            term: term.into(),
            message: message.into(),
        }
    }

    pub fn clone_failed(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Clone {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn open_failed(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Open {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn branch_enumeration(message: impl ToString) -> Self {
        Self::BranchEnumeration(message.to_string())
    }

    pub fn checkout_failed(branch: impl Into<String>, message: impl ToString) -> Self {
        Self::Checkout {
            branch: branch.into(),
            message: message.to_string(),
        }
    }

    pub fn update_failed(remote: impl Into<String>, message: impl ToString) -> Self {
        Self::Update {
            remote: remote.into(),
            message: message.to_string(),
        }
    }

    pub fn search_failed(message: impl ToString) -> Self {
        Self::Search(message.to_string())
    }

    pub fn timeout(limit: Duration) -> Self {
        Self::Timeout {
            limit: limit.into(),
        }
    }

    pub fn write_failed(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Write {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error must abort the whole run rather than one repository or branch
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigError(_)
                | Self::InvalidPattern { .. }
                | Self::Search(_)
                | Self::Write { .. }
                | Self::IoError(_)
        )
    }

    /// Whether this error came from a deadline or run cancellation
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ScanError::config_error("Missing required field");
        assert!(matches!(err, ScanError::ConfigError(_)));

        let err = ScanError::invalid_pattern("foo(", "unclosed group");
        assert!(matches!(err, ScanError::InvalidPattern { .. }));

        let err = ScanError::clone_failed("https://example.com/org/sample.git", "network down");
        assert!(matches!(err, ScanError::Clone { .. }));

        let err = ScanError::checkout_failed("refs/remotes/origin/main", "conflict");
        assert!(matches!(err, ScanError::Checkout { .. }));

        let err = ScanError::timeout(Duration::from_secs(90));
        assert!(matches!(err, ScanError::Timeout { .. }));
    }

    #[test]
    fn test_error_messages() {
        let err = ScanError::config_error("Missing required field");
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required field"
        );

        let err = ScanError::invalid_pattern("foo(", "unclosed group");
        assert_eq!(err.to_string(), "Invalid pattern 'foo(': unclosed group");

        let err = ScanError::timeout(Duration::from_secs(90));
        assert_eq!(err.to_string(), "Timed out after 1m 30s");

        let err = ScanError::open_failed("repos/sample", "not a git repository");
        assert_eq!(
            err.to_string(),
            "Failed to open working copy at repos/sample: not a git repository"
        );
    }

    #[test]
    fn test_fatal_classification() {
        assert!(ScanError::config_error("bad").is_fatal());
        assert!(ScanError::invalid_pattern("(", "bad").is_fatal());
        assert!(ScanError::search_failed("tree walk failed").is_fatal());
        assert!(ScanError::write_failed("out.csv", "read-only").is_fatal());

        assert!(!ScanError::clone_failed("u", "x").is_fatal());
        assert!(!ScanError::open_failed("p", "x").is_fatal());
        assert!(!ScanError::branch_enumeration("x").is_fatal());
        assert!(!ScanError::checkout_failed("b", "x").is_fatal());
        assert!(!ScanError::update_failed("origin", "x").is_fatal());
        assert!(!ScanError::timeout(Duration::from_secs(1)).is_fatal());
        assert!(!ScanError::Cancelled.is_fatal());
    }

    #[test]
    fn test_interruption_classification() {
        assert!(ScanError::timeout(Duration::from_secs(1)).is_interruption());
        assert!(ScanError::Cancelled.is_interruption());
        assert!(!ScanError::open_failed("p", "x").is_interruption());
    }
}
