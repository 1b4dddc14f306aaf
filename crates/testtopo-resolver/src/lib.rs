//! Incremental test-topology resolver.
//!
//! A [`TestTopology`] follows a sequence of commits and keeps, per suite, the
//! set of files that suite's tests depend on:
//!
//! ```text
//! moz.build ──► mochitest.ini / reftest.list ──► test and support files
//!  (DeclarationState)      (SuiteState)             (Resolution)
//! ```
//!
//! Each [`update`](TestTopology::update) diffs the previous tree against the
//! new one and recomputes only the suite states whose declaration, manifests,
//! or included manifests appear in the diff. Per-suite [`SuiteMatcher`]s are
//! rebuilt from the aggregated resolution and answer
//! [`classify`](TestTopology::classify) queries.
//!
//! Malformed or missing files never fail an update; they are reported to the
//! injected [`DiagnosticSink`] and contribute nothing.

pub mod cache;
pub mod changes;
pub mod config;
mod context;
pub mod declaration;
pub mod diagnostics;
pub mod error;
pub mod matcher;
pub mod suite;
pub mod topology;

pub use cache::{ParseCache, RawObjectCache};
pub use changes::SuiteChanges;
pub use config::ResolverConfig;
pub use declaration::DeclarationState;
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, TracingSink};
pub use error::{ResolverError, ResolverResult};
pub use matcher::SuiteMatcher;
pub use suite::SuiteState;
pub use topology::TestTopology;
