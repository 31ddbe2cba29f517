use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::errors::{ScanError, ScanResult};

/// Run-wide cancellation flag shared by every worker
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks every worker to stop at its next checkpoint
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            debug!("Scan cancellation requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Time budget for processing one repository.
///
/// Workers call [`Deadline::check`] between steps; the git backend also polls
/// [`Deadline::is_exhausted`] from its transfer callbacks so a slow clone or fetch
/// is aborted mid-transfer. The searcher waits on its processing thread for at
/// most [`Deadline::remaining`], which bounds a remote that never answers.
#[derive(Debug, Clone)]
pub struct Deadline {
    limit: Duration,
    /// `None` when the limit is too large to represent
    expires_at: Option<Instant>,
    token: CancelToken,
}

impl Deadline {
    pub fn after(limit: Duration, token: CancelToken) -> Self {
        Self {
            limit,
            expires_at: Instant::now().checked_add(limit),
            token,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    /// True once the deadline passed or the run was cancelled
    pub fn is_exhausted(&self) -> bool {
        self.token.is_cancelled() || self.is_expired()
    }

    /// The error describing why work must stop, if it must
    pub fn interruption(&self) -> Option<ScanError> {
        if self.token.is_cancelled() {
            Some(ScanError::Cancelled)
        } else if self.is_expired() {
            Some(ScanError::timeout(self.limit))
        } else {
            None
        }
    }

    pub fn check(&self) -> ScanResult<()> {
        match self.interruption() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn remaining(&self) -> Duration {
        match self.expires_at {
            Some(at) => at.saturating_duration_since(Instant::now()),
            None => Duration::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_deadline_passes() {
        let deadline = Deadline::after(Duration::from_secs(60), CancelToken::new());
        assert!(deadline.check().is_ok());
        assert!(!deadline.is_exhausted());
        assert!(deadline.remaining() > Duration::from_secs(50));
    }

    #[test]
    fn test_expired_deadline_reports_timeout() {
        let deadline = Deadline::after(Duration::ZERO, CancelToken::new());
        assert!(deadline.is_expired());
        assert!(matches!(deadline.check(), Err(ScanError::Timeout { .. })));
    }

    #[test]
    fn test_cancellation_wins_over_timeout() {
        let token = CancelToken::new();
        let deadline = Deadline::after(Duration::ZERO, token.clone());
        token.cancel();
        assert!(matches!(deadline.check(), Err(ScanError::Cancelled)));
    }

    #[test]
    fn test_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
