//! Month-bucketed counters over classified changes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use testtopo_types::{ChangeKind, SuiteKind};

use crate::classifier::ChangeRecord;

/// Counters per `YYYY-MM` month.
///
/// Columns, in order: `<suite>-added` for every suite, then `-modified`, then
/// `-total` (a change counted once per suite however it touched it), then
/// `total-added`, `total-modified`, `test-total` and `total`. `test-total`
/// counts changes that touched some suite other than only the
/// web-platform-tests metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTally {
    months: BTreeMap<String, BTreeMap<String, u64>>,
}

impl MonthlyTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every column name, in report order.
    pub fn headings() -> Vec<String> {
        let mut headings = Vec::new();
        for status in ["added", "modified", "total"] {
            for suite in SuiteKind::ALL {
                headings.push(format!("{suite}-{status}"));
            }
        }
        headings.extend(
            ["total-added", "total-modified", "test-total", "total"]
                .into_iter()
                .map(String::from),
        );
        headings
    }

    pub fn add(&mut self, record: &ChangeRecord) {
        let month = record.date.format("%Y-%m").to_string();
        let counters = self.months.entry(month).or_default();
        let mut bump = |heading: String| *counters.entry(heading).or_default() += 1;

        bump("total".to_string());
        for (kind, name) in [(ChangeKind::Added, "added"), (ChangeKind::Modified, "modified")] {
            let Some(suites) = record.changes.get(kind) else {
                continue;
            };
            if suites.is_empty() {
                continue;
            }
            bump(format!("total-{name}"));
            for suite in suites {
                bump(format!("{suite}-{name}"));
            }
        }

        let touched = record.changes.suites();
        for suite in &touched {
            bump(format!("{suite}-total"));
        }
        let only_meta = touched.len() == 1 && touched.contains(&SuiteKind::WebPlatformTestsMeta);
        if !touched.is_empty() && !only_meta {
            bump("test-total".to_string());
        }
    }

    pub fn months(&self) -> impl Iterator<Item = &str> {
        self.months.keys().map(String::as_str)
    }

    pub fn get(&self, month: &str, heading: &str) -> u64 {
        self.months
            .get(month)
            .and_then(|counters| counters.get(heading))
            .copied()
            .unwrap_or(0)
    }

    /// One row per month, values in [`headings`](Self::headings) order.
    pub fn rows(&self) -> Vec<(String, Vec<u64>)> {
        let headings = Self::headings();
        self.months
            .keys()
            .map(|month| {
                let values = headings.iter().map(|h| self.get(month, h)).collect();
                (month.clone(), values)
            })
            .collect()
    }
}

impl<'a> Extend<&'a ChangeRecord> for MonthlyTally {
    fn extend<I: IntoIterator<Item = &'a ChangeRecord>>(&mut self, records: I) {
        for record in records {
            self.add(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use testtopo_resolver::SuiteChanges;

    fn record(month: u32, added: &[SuiteKind], modified: &[SuiteKind]) -> ChangeRecord {
        let mut changes = SuiteChanges::new();
        for suite in added {
            changes.insert(ChangeKind::Added, *suite);
        }
        for suite in modified {
            changes.insert(ChangeKind::Modified, *suite);
        }
        ChangeRecord {
            id: format!("bug-{month}"),
            date: Utc.with_ymd_and_hms(2024, month, 2, 0, 0, 0).unwrap(),
            changes,
        }
    }

    #[test]
    fn headings_cover_every_suite_and_status() {
        let headings = MonthlyTally::headings();
        assert_eq!(headings.len(), 5 * 3 + 4);
        assert_eq!(headings[0], "crashtest-added");
        assert_eq!(headings[14], "web-platform-tests-meta-total");
        assert_eq!(headings.last().map(String::as_str), Some("total"));
    }

    #[test]
    fn counts_statuses_and_totals() {
        let mut tally = MonthlyTally::new();
        tally.add(&record(3, &[SuiteKind::Mochitest], &[SuiteKind::Mochitest, SuiteKind::Reftest]));
        tally.add(&record(3, &[], &[]));

        assert_eq!(tally.get("2024-03", "total"), 2);
        assert_eq!(tally.get("2024-03", "total-added"), 1);
        assert_eq!(tally.get("2024-03", "total-modified"), 1);
        assert_eq!(tally.get("2024-03", "mochitest-added"), 1);
        assert_eq!(tally.get("2024-03", "mochitest-modified"), 1);
        assert_eq!(tally.get("2024-03", "mochitest-total"), 1);
        assert_eq!(tally.get("2024-03", "reftest-total"), 1);
        assert_eq!(tally.get("2024-03", "test-total"), 1);
        assert_eq!(tally.get("2024-04", "total"), 0);
    }

    #[test]
    fn metadata_only_changes_are_not_test_changes() {
        let mut tally = MonthlyTally::new();
        tally.extend(&[
            record(5, &[], &[SuiteKind::WebPlatformTestsMeta]),
            record(5, &[SuiteKind::WebPlatformTests], &[SuiteKind::WebPlatformTestsMeta]),
        ]);
        assert_eq!(tally.get("2024-05", "web-platform-tests-meta-total"), 2);
        assert_eq!(tally.get("2024-05", "test-total"), 1);
    }

    #[test]
    fn rows_follow_heading_order() {
        let mut tally = MonthlyTally::new();
        tally.add(&record(1, &[SuiteKind::Crashtest], &[]));
        tally.add(&record(2, &[], &[]));
        let rows = tally.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "2024-01");
        assert_eq!(rows[0].1[0], 1);
        assert_eq!(rows[1].1.iter().sum::<u64>(), 1);
        assert_eq!(tally.months().collect::<Vec<_>>(), vec!["2024-01", "2024-02"]);
    }
}
