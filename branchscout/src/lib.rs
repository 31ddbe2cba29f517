pub mod cancel;
pub mod config;
pub mod errors;
pub mod metrics;
pub mod observer;
pub mod report;
pub mod results;
pub mod search;
pub mod vcs;

pub use cancel::{CancelToken, Deadline};
pub use config::ScanConfig;
pub use errors::{ScanError, ScanResult};
pub use metrics::{ScanMetrics, ScanStats};
pub use observer::{NullObserver, ScanObserver, TracingObserver};
pub use report::write_csv;
pub use results::{MatchRecord, ScanReport, REPORT_HEADER};
pub use search::{run, scan};
pub use vcs::{GitBackend, VersionControl, WorkingCopy};
