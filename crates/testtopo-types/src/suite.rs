//! Suite and change classification tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// One of the fixed test categories tracked by the resolver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuiteKind {
    /// Directive-manifest suite (`crashtest.list`).
    Crashtest,
    /// Directive-manifest suite (`reftest.list`).
    Reftest,
    /// Tabular-manifest suite (`mochitest.ini`).
    Mochitest,
    /// Upstream web-platform-tests tree, matched by path prefix.
    WebPlatformTests,
    /// Web-platform-tests expectation metadata, matched by path prefix.
    WebPlatformTestsMeta,
}

/// How a suite's relevant files are discovered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManifestFormat {
    /// Sectioned `key: value` manifests.
    Tabular,
    /// Line-oriented reftest-style directives.
    Directive,
    /// No manifests; a fixed path-prefix test tree.
    PrefixTree,
}

impl SuiteKind {
    /// Every suite kind, in report order.
    pub const ALL: [SuiteKind; 5] = [
        SuiteKind::Crashtest,
        SuiteKind::Reftest,
        SuiteKind::Mochitest,
        SuiteKind::WebPlatformTests,
        SuiteKind::WebPlatformTestsMeta,
    ];

    /// Suites whose tests are declared through build files.
    pub const MANIFEST_BACKED: [SuiteKind; 3] =
        [SuiteKind::Crashtest, SuiteKind::Reftest, SuiteKind::Mochitest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crashtest => "crashtest",
            Self::Reftest => "reftest",
            Self::Mochitest => "mochitest",
            Self::WebPlatformTests => "web-platform-tests",
            Self::WebPlatformTestsMeta => "web-platform-tests-meta",
        }
    }

    pub fn format(&self) -> ManifestFormat {
        match self {
            Self::Mochitest => ManifestFormat::Tabular,
            Self::Reftest | Self::Crashtest => ManifestFormat::Directive,
            Self::WebPlatformTests | Self::WebPlatformTestsMeta => ManifestFormat::PrefixTree,
        }
    }

    /// The build-file variable that lists this suite's manifests, if any.
    pub fn build_token(&self) -> Option<&'static str> {
        match self {
            Self::Mochitest => Some("MOCHITEST_MANIFESTS"),
            Self::Reftest => Some("REFTEST_MANIFESTS"),
            Self::Crashtest => Some("CRASHTEST_MANIFESTS"),
            Self::WebPlatformTests | Self::WebPlatformTestsMeta => None,
        }
    }

    /// Reverse of [`SuiteKind::build_token`].
    pub fn from_build_token(token: &str) -> Option<Self> {
        Self::MANIFEST_BACKED
            .into_iter()
            .find(|kind| kind.build_token() == Some(token))
    }
}

impl fmt::Display for SuiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SuiteKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| TypeError::UnknownSuite(s.to_string()))
    }
}

/// The status of a path between two tree snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl ChangeKind {
    /// Single-letter status code, as printed by `git diff --name-status`.
    pub fn code(&self) -> char {
        match self {
            Self::Added => 'A',
            Self::Modified => 'M',
            Self::Deleted => 'D',
        }
    }

    /// The status seen when diffing in the opposite direction.
    pub fn inverse(&self) -> Self {
        match self {
            Self::Added => Self::Deleted,
            Self::Modified => Self::Modified,
            Self::Deleted => Self::Added,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_tokens_roundtrip() {
        for kind in SuiteKind::MANIFEST_BACKED {
            let token = kind.build_token().unwrap();
            assert_eq!(SuiteKind::from_build_token(token), Some(kind));
        }
        assert_eq!(SuiteKind::from_build_token("XPCSHELL_TESTS_MANIFESTS"), None);
    }

    #[test]
    fn prefix_suites_have_no_token() {
        assert!(SuiteKind::WebPlatformTests.build_token().is_none());
        assert_eq!(
            SuiteKind::WebPlatformTestsMeta.format(),
            ManifestFormat::PrefixTree
        );
    }

    #[test]
    fn parse_from_display_name() {
        let kind: SuiteKind = "web-platform-tests-meta".parse().unwrap();
        assert_eq!(kind, SuiteKind::WebPlatformTestsMeta);
        assert!("xpcshell".parse::<SuiteKind>().is_err());
    }

    #[test]
    fn serde_uses_display_names() {
        let json = serde_json::to_string(&SuiteKind::WebPlatformTests).unwrap();
        assert_eq!(json, "\"web-platform-tests\"");
    }

    #[test]
    fn change_kind_inverse() {
        assert_eq!(ChangeKind::Added.inverse(), ChangeKind::Deleted);
        assert_eq!(ChangeKind::Deleted.inverse(), ChangeKind::Added);
        assert_eq!(ChangeKind::Modified.inverse(), ChangeKind::Modified);
        assert_eq!(ChangeKind::Modified.code(), 'M');
    }
}
