//! Per-worker classification of logical changes.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use testtopo_diff::diff_trees;
use testtopo_resolver::{DiagnosticSink, ResolverConfig, SuiteChanges, TestTopology};
use testtopo_store::ObjectStore;
use tracing::{debug, info, warn};

use crate::change::{candidate_test_paths, group_commit_runs, is_empty, LogicalChange};
use crate::config::HistoryConfig;
use crate::error::HistoryResult;
use crate::oracle::{cross_check, OracleData, SuiteMismatch};

/// Which suites one logical change added to or modified.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: String,
    pub date: DateTime<Utc>,
    pub changes: SuiteChanges,
}

/// A change that could not be classified.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedChange {
    pub id: String,
    pub reason: String,
}

/// Output of [`ChangeClassifier::classify_all`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyOutcome {
    pub records: Vec<ChangeRecord>,
    pub failed: Vec<FailedChange>,
}

/// Classifies logical changes one after another with a single topology.
///
/// Each worker owns one classifier. The topology is created lazily at the
/// first change and then advanced from change to change, whether or not the
/// changes are related.
pub struct ChangeClassifier {
    store: Arc<dyn ObjectStore>,
    resolver_config: ResolverConfig,
    config: HistoryConfig,
    sink: Arc<dyn DiagnosticSink>,
    topology: Option<TestTopology>,
}

impl ChangeClassifier {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        resolver_config: ResolverConfig,
        config: HistoryConfig,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            store,
            resolver_config,
            config,
            sink,
            topology: None,
        }
    }

    pub fn topology(&self) -> Option<&TestTopology> {
        self.topology.as_ref()
    }

    /// Classify one change.
    ///
    /// For every commit run the topology is advanced to the run's head and
    /// the base-to-head diff is classified. Suites already found under a
    /// status are not tested again for it.
    pub fn classify(&mut self, change: &LogicalChange) -> HistoryResult<ChangeRecord> {
        let store = &*self.store;
        let mut changes = SuiteChanges::new();

        for run in group_commit_runs(store, &change.commits)? {
            let head = *run.head();
            let topology = self.topology.get_or_insert_with(|| {
                TestTopology::new(
                    self.store.clone(),
                    self.resolver_config.clone(),
                    self.sink.clone(),
                )
            });
            topology.update(&head)?;

            let head_tree = store.read_commit(&head)?.tree;
            let base_tree = match &run.base {
                Some(base) => Some(store.read_commit(base)?.tree),
                None => None,
            };
            let diff = diff_trees(store, base_tree.as_ref(), Some(&head_tree))?;
            let paths = candidate_test_paths(&diff, &self.config.skip_extensions);
            if is_empty(&paths) {
                debug!(change = %change.id, head = %head.short_hex(), "no candidate test paths");
                continue;
            }
            let found = topology.classify(&paths, &changes);
            changes.extend(&found);
        }

        debug!(change = %change.id, suites = ?changes.suites(), "classified change");
        Ok(ChangeRecord {
            id: change.id.clone(),
            date: change.date,
            changes,
        })
    }

    /// Compare the topology's current summaries with an oracle enumeration.
    ///
    /// Before the first change there is no topology and every suite the
    /// oracle lists is reported.
    pub fn cross_check(&self, oracle: &OracleData) -> Vec<SuiteMismatch> {
        let empty = BTreeMap::new();
        let resolved = self.topology.as_ref().map_or(&empty, TestTopology::summaries);
        let mismatches = cross_check(oracle, resolved);
        if !mismatches.is_empty() {
            warn!(
                commit = ?self.topology.as_ref().and_then(TestTopology::commit),
                suites = mismatches.len(),
                "topology disagrees with the test oracle"
            );
        }
        mismatches
    }

    /// Classify every change; failures are logged and skipped.
    pub fn classify_all<'a, I>(&mut self, changes: I) -> ClassifyOutcome
    where
        I: IntoIterator<Item = &'a LogicalChange>,
    {
        let mut outcome = ClassifyOutcome::default();
        for change in changes {
            match self.classify(change) {
                Ok(record) => outcome.records.push(record),
                Err(err) => {
                    warn!(change = %change.id, error = %err, "dropping change");
                    outcome.failed.push(FailedChange {
                        id: change.id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        info!(
            classified = outcome.records.len(),
            failed = outcome.failed.len(),
            "classification finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use testtopo_resolver::TracingSink;
    use testtopo_store::{InMemoryObjectStore, TreeBuilder};
    use testtopo_types::{ObjectId, SuiteKind};

    struct Fixture {
        store: Arc<InMemoryObjectStore>,
        tree: TreeBuilder,
        head: Option<ObjectId>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut tree = TreeBuilder::new();
            tree.insert("dom/moz.build", "MOCHITEST_MANIFESTS += ['tests/mochitest.ini']\n")
                .unwrap();
            tree.insert("dom/tests/mochitest.ini", "[test_a.html]\n").unwrap();
            tree.insert("dom/tests/test_a.html", "a").unwrap();
            tree.insert("dom/impl.cpp", "int x;").unwrap();
            let mut fixture = Self {
                store: Arc::new(InMemoryObjectStore::new()),
                tree,
                head: None,
            };
            fixture.commit();
            fixture
        }

        fn commit(&mut self) -> ObjectId {
            let parents = self.head.into_iter().collect();
            let id = self.tree.commit(&*self.store, parents, "c", 0).unwrap();
            self.head = Some(id);
            id
        }

        fn edit(&mut self, path: &str, content: &str) -> ObjectId {
            self.tree.insert(path, content).unwrap();
            self.commit()
        }

        fn classifier(&self) -> ChangeClassifier {
            ChangeClassifier::new(
                self.store.clone(),
                ResolverConfig::default(),
                HistoryConfig::default(),
                Arc::new(TracingSink),
            )
        }
    }

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn adds_and_modifies_across_runs() {
        let mut fixture = Fixture::new();
        let c1 = fixture.edit("dom/tests/test_a.html", "a2");
        let _other = fixture.edit("unrelated.txt", "x");
        fixture.tree.insert("dom/tests/test_b.html", "b").unwrap();
        let c3 = fixture.edit(
            "dom/tests/mochitest.ini",
            "[test_a.html]\n[test_b.html]\n",
        );

        let change = LogicalChange::new("1234", date(), vec![c3, c1]);
        let record = fixture.classifier().classify(&change).unwrap();
        assert_eq!(record.id, "1234");
        assert!(record.changes.added.contains(&SuiteKind::Mochitest));
        assert!(record.changes.modified.contains(&SuiteKind::Mochitest));
    }

    #[test]
    fn source_only_change_touches_nothing() {
        let mut fixture = Fixture::new();
        let c1 = fixture.edit("dom/impl.cpp", "int y;");
        let change = LogicalChange::new("1", date(), vec![c1]);
        let record = fixture.classifier().classify(&change).unwrap();
        assert!(record.changes.is_empty());
    }

    #[test]
    fn topology_is_reused_between_changes() {
        let mut fixture = Fixture::new();
        let c1 = fixture.edit("dom/tests/test_a.html", "a2");
        let c2 = fixture.edit("dom/tests/test_a.html", "a3");
        let mut classifier = fixture.classifier();

        classifier
            .classify(&LogicalChange::new("2", date(), vec![c2]))
            .unwrap();
        classifier
            .classify(&LogicalChange::new("1", date(), vec![c1]))
            .unwrap();
        assert_eq!(classifier.topology().unwrap().commit(), Some(&c1));
    }

    #[test]
    fn failed_changes_are_dropped_and_the_run_continues() {
        let mut fixture = Fixture::new();
        let c1 = fixture.edit("dom/tests/test_a.html", "a2");
        let changes = vec![
            LogicalChange::new("bad", date(), vec![ObjectId::from_bytes(b"missing")]),
            LogicalChange::new("good", date(), vec![c1]),
        ];
        let outcome = fixture.classifier().classify_all(&changes);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].id, "good");
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].id, "bad");
    }

    #[test]
    fn cross_check_against_the_current_topology() {
        let mut fixture = Fixture::new();
        let c1 = fixture.edit("dom/tests/test_a.html", "a2");
        let mut classifier = fixture.classifier();

        let oracle: OracleData = serde_json::from_str(
            r#"{"mochitest": {"counts": 1, "paths": ["dom/tests/test_a.html"]}}"#,
        )
        .unwrap();
        assert_eq!(classifier.cross_check(&oracle).len(), 1);

        classifier
            .classify(&LogicalChange::new("1", date(), vec![c1]))
            .unwrap();
        assert!(classifier.cross_check(&oracle).is_empty());

        let stale: OracleData = serde_json::from_str(
            r#"{"mochitest": {"counts": 2, "paths": ["dom/tests/test_a.html"]}}"#,
        )
        .unwrap();
        let mismatches = classifier.cross_check(&stale);
        assert_eq!(mismatches[0].oracle_count, 2);
        assert_eq!(mismatches[0].resolved_count, 1);
        assert!(mismatches[0].missing.is_empty());
    }

    #[test]
    fn root_commit_is_diffed_against_nothing() {
        let fixture = Fixture::new();
        let root = fixture.head.unwrap();
        let record = fixture
            .classifier()
            .classify(&LogicalChange::new("0", date(), vec![root]))
            .unwrap();
        assert_eq!(
            record.changes.added,
            std::collections::BTreeSet::from([SuiteKind::Mochitest])
        );
    }
}
