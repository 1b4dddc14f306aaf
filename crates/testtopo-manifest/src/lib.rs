//! Parsers for the three file grammars that make up the test topology.
//!
//! - [`build_decl`]: build declarations listing each suite's manifests
//! - [`tabular`]: indentation-based manifests where every section is a test
//! - [`directive`]: line-oriented reference-test manifests with includes
//!
//! All parsers work on raw bytes plus the file's own repo path, and return
//! repo-relative normalized paths. None of them touch the object store.

pub mod build_decl;
pub mod directive;
pub mod error;
pub mod tabular;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub use build_decl::{mentions_manifests, parse_build_declaration, BuildDeclaration};
pub use directive::DirectiveManifest;
pub use error::{FormatError, FormatResult};
pub use tabular::TabularManifest;

/// Tests counted and paths found relevant by resolving one or more manifests.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub test_count: usize,
    pub relevant_paths: BTreeSet<String>,
}

impl Resolution {
    /// Fold another resolution into this one.
    pub fn merge(&mut self, other: Resolution) {
        self.test_count += other.test_count;
        self.relevant_paths.extend(other.relevant_paths);
    }
}
