/// Repository scanning.
///
/// A scan compiles its terms once, splits the configured repositories into
/// windows of `concurrentSearches` entries and processes each window on a
/// rayon pool. Every worker owns one repository: it obtains a working copy,
/// enumerates the remote-tracking branches, checks each one out in turn and
/// greps the checked-out tree for every term.
///
/// Failures are scoped. A branch that cannot be checked out is skipped, a
/// repository that cannot be cloned, opened, listed or finished in time is
/// skipped, and anything else stops the whole run.
pub mod branches;
pub mod engine;
pub mod matcher;
pub mod repository;
pub mod scheduler;

pub use branches::{remote_tracking_branches, BranchRef};
pub use engine::{run, scan};
pub use matcher::{build_pattern, compile_terms, CompiledTerm, PatternOptions};
pub use repository::{derive_local_name, RepositoryHandle, RepositoryOutcome, RepositorySearcher};
pub use scheduler::{partition_windows, BatchScheduler};
