//! Non-fatal problems found while resolving manifests.

use std::fmt;
use std::sync::Mutex;

use testtopo_manifest::FormatError;
use tracing::warn;

/// A file that contributed nothing to the topology, and why.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// The file exists but violates its grammar.
    Format { path: String, error: FormatError },
    /// A referenced manifest is not present in the current tree.
    Lookup { path: String },
}

impl Diagnostic {
    pub fn path(&self) -> &str {
        match self {
            Self::Format { path, .. } | Self::Lookup { path } => path,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format { path, error } => write!(f, "{path}: {error}"),
            Self::Lookup { path } => write!(f, "{path}: not found in tree"),
        }
    }
}

/// Receiver for [`Diagnostic`]s, injected into the topology.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards every diagnostic to `tracing` at warn level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::Format { path, error } => {
                warn!(path = %path, error = %error, "skipping malformed file");
            }
            Diagnostic::Lookup { path } => {
                warn!(path = %path, "skipping missing manifest");
            }
        }
    }
}

/// Accumulates diagnostics in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().expect("lock poisoned").clone()
    }

    /// Drain everything reported so far.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock().expect("lock poisoned"))
    }

    pub fn len(&self) -> usize {
        self.diagnostics.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().expect("lock poisoned").push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn collecting_sink_drains() {
        let sink = CollectingSink::new();
        sink.report(Diagnostic::Lookup {
            path: "a/reftest.list".into(),
        });
        sink.report(Diagnostic::Format {
            path: "b/mochitest.ini".into(),
            error: FormatError::MissingSection { line: 1 },
        });
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.diagnostics()[1].path(), "b/mochitest.ini");
        assert_eq!(sink.take_all().len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn sinks_are_object_safe_and_shareable() {
        let collecting = Arc::new(CollectingSink::new());
        let sinks: Vec<Arc<dyn DiagnosticSink>> = vec![Arc::new(TracingSink), collecting.clone()];
        for sink in &sinks {
            sink.report(Diagnostic::Lookup { path: "x".into() });
        }
        assert_eq!(collecting.len(), 1);
    }

    #[test]
    fn display_names_the_file() {
        let diagnostic = Diagnostic::Format {
            path: "dir/mochitest.ini".into(),
            error: FormatError::MissingSection { line: 3 },
        };
        assert!(diagnostic.to_string().starts_with("dir/mochitest.ini: line 3"));
    }
}
