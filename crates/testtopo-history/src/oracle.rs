//! Cold-start ground truth from an external test enumerator, cached on disk.
//!
//! The enumerator's output is persisted as `<dir>/<blake3-hex>.json`, keyed
//! by the hash of the output itself. A caller that remembers the hash from
//! an earlier run can skip the (slow) enumerator entirely.
//!
//! [`cross_check`] compares an enumeration with what a topology resolved.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use testtopo_manifest::Resolution;
use testtopo_types::{ManifestFormat, ObjectId, SuiteKind};
use tracing::{debug, info, warn};

use crate::error::HistoryResult;

/// One suite in the enumerator's output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteEnumeration {
    pub counts: usize,
    pub paths: BTreeSet<String>,
}

impl From<SuiteEnumeration> for Resolution {
    fn from(value: SuiteEnumeration) -> Self {
        Resolution {
            test_count: value.counts,
            relevant_paths: value.paths,
        }
    }
}

/// Authoritative enumeration, per suite.
pub type OracleData = BTreeMap<SuiteKind, SuiteEnumeration>;

/// An external process that can enumerate the tests of a commit.
pub trait TestOracle {
    /// Raw JSON output for `commit`: `{suite: {"counts": n, "paths": [...]}}`.
    fn enumerate(&self, commit: &ObjectId) -> HistoryResult<Vec<u8>>;
}

/// Oracle output loaded through the cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedEnumeration {
    /// Hash to pass back to [`OracleCache::load`] next time.
    pub hash: String,
    pub data: OracleData,
}

/// Directory of oracle outputs named by content hash.
#[derive(Clone, Debug)]
pub struct OracleCache {
    dir: PathBuf,
}

impl OracleCache {
    /// Open (creating if needed) the cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> HistoryResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}.json"))
    }

    /// Load the enumeration for `commit`.
    ///
    /// With a known hash whose file exists the oracle is not consulted. A
    /// file that fails to parse is deleted and the oracle is run once more;
    /// a second failure is returned.
    pub fn load(
        &self,
        commit: &ObjectId,
        known_hash: Option<&str>,
        oracle: &dyn TestOracle,
    ) -> HistoryResult<CachedEnumeration> {
        self.load_inner(commit, known_hash, oracle, false)
    }

    fn load_inner(
        &self,
        commit: &ObjectId,
        known_hash: Option<&str>,
        oracle: &dyn TestOracle,
        is_retry: bool,
    ) -> HistoryResult<CachedEnumeration> {
        let cached = known_hash
            .map(|hash| (hash.to_string(), self.path_for(hash)))
            .filter(|(_, file)| file.exists());

        let (hash, file) = match cached {
            Some(hit) => {
                debug!(commit = %commit.short_hex(), hash = %hit.0, "using cached enumeration");
                hit
            }
            None => {
                info!(commit = %commit.short_hex(), "running test oracle");
                let output = oracle.enumerate(commit)?;
                let hash = blake3::hash(&output).to_hex().to_string();
                let file = self.path_for(&hash);
                fs::write(&file, &output)?;
                (hash, file)
            }
        };

        match read_enumeration(&file) {
            Ok(data) => Ok(CachedEnumeration { hash, data }),
            Err(err) => {
                warn!(file = %file.display(), error = %err, "discarding unreadable enumeration");
                // Best effort: a concurrent worker may already have removed it.
                let _ = fs::remove_file(&file);
                if is_retry {
                    return Err(err);
                }
                self.load_inner(commit, None, oracle, true)
            }
        }
    }
}

/// A manifest-backed suite where the oracle and a topology disagree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteMismatch {
    pub suite: SuiteKind,
    pub oracle_count: usize,
    pub resolved_count: usize,
    /// Listed by the oracle but not resolved.
    pub missing: BTreeSet<String>,
    /// Resolved but not listed by the oracle.
    pub extra: BTreeSet<String>,
}

/// Compare `oracle` with `resolved` (typically [`TestTopology::summaries`]).
///
/// Prefix-tree suites are skipped; a suite absent on one side counts as
/// empty there.
///
/// [`TestTopology::summaries`]: testtopo_resolver::TestTopology::summaries
pub fn cross_check(
    oracle: &OracleData,
    resolved: &BTreeMap<SuiteKind, Resolution>,
) -> Vec<SuiteMismatch> {
    let empty_enumeration = SuiteEnumeration::default();
    let empty_resolution = Resolution::default();
    let suites: BTreeSet<SuiteKind> = oracle.keys().chain(resolved.keys()).copied().collect();

    let mut mismatches = Vec::new();
    for suite in suites {
        if suite.format() == ManifestFormat::PrefixTree {
            continue;
        }
        let expected = oracle.get(&suite).unwrap_or(&empty_enumeration);
        let actual = resolved.get(&suite).unwrap_or(&empty_resolution);
        if expected.counts == actual.test_count && expected.paths == actual.relevant_paths {
            continue;
        }
        let mismatch = SuiteMismatch {
            suite,
            oracle_count: expected.counts,
            resolved_count: actual.test_count,
            missing: expected.paths.difference(&actual.relevant_paths).cloned().collect(),
            extra: actual.relevant_paths.difference(&expected.paths).cloned().collect(),
        };
        debug!(
            suite = %suite,
            oracle = mismatch.oracle_count,
            resolved = mismatch.resolved_count,
            missing = mismatch.missing.len(),
            extra = mismatch.extra.len(),
            "enumeration mismatch"
        );
        mismatches.push(mismatch);
    }
    mismatches
}

fn read_enumeration(file: &Path) -> HistoryResult<OracleData> {
    let bytes = fs::read(file)?;
    Ok(serde_json::from_slice(&bytes)?)
}
