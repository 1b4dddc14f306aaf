//! Walking landed changes through a [`TestTopology`](testtopo_resolver::TestTopology).
//!
//! A [`LogicalChange`] is the set of commits landed for one bug. The
//! [`ChangeClassifier`] splits it into first-parent [`CommitRun`]s, advances
//! its topology to each run head, and records which suites the change added
//! to or modified. [`MonthlyTally`] buckets the resulting records by month.
//!
//! [`OracleCache`] stores the output of an external [`TestOracle`] keyed by
//! content hash; [`ChangeClassifier::cross_check`] compares it with the
//! classifier's topology.

pub mod change;
pub mod classifier;
pub mod config;
pub mod error;
pub mod oracle;
pub mod summary;

pub use change::{candidate_test_paths, group_commit_runs, CommitRun, LogicalChange};
pub use classifier::{ChangeClassifier, ChangeRecord, ClassifyOutcome, FailedChange};
pub use config::HistoryConfig;
pub use error::{HistoryError, HistoryResult};
pub use oracle::{
    cross_check, CachedEnumeration, OracleCache, OracleData, SuiteEnumeration, SuiteMismatch,
    TestOracle,
};
pub use summary::MonthlyTally;
