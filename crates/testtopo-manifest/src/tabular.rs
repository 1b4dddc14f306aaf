//! Tabular (`mochitest.ini`-style) manifest parsing.
//!
//! ```text
//! [DEFAULT]
//! support-files =
//!   helper.js
//!   file_frame.html   # comments are stripped first
//!
//! [test_basic.html]
//! skip-if = os == "android"
//! ```
//!
//! Sections are `[name]` lines. Keys split on the first `:` or `=`; a line
//! indented deeper than its key line continues that key's value. A blank (or
//! comment-only) line ends any continuation.

use std::collections::BTreeMap;

use testtopo_types::path;
use tracing::trace;

use crate::error::{decode, FormatError, FormatResult};
use crate::Resolution;

/// Name of the section whose keys apply to every test in the manifest.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Key listing files the tests load but that are not tests themselves.
pub const SUPPORT_FILES_KEY: &str = "support-files";

/// One `[name]` block and its keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub values: BTreeMap<String, String>,
}

/// A parsed tabular manifest, sections in file order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TabularManifest {
    pub sections: Vec<Section>,
}

impl TabularManifest {
    pub fn parse_bytes(data: &[u8]) -> FormatResult<Self> {
        Self::parse(decode(data)?)
    }

    pub fn parse(text: &str) -> FormatResult<Self> {
        let mut sections: Vec<Section> = Vec::new();
        // (key, indent of the key line)
        let mut current_key: Option<(String, usize)> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = strip_comment(raw);
            let content = line.trim();
            if content.is_empty() {
                current_key = None;
                continue;
            }
            let indent = line.len() - line.trim_start().len();

            if let Some(name) = section_header(content) {
                if sections.iter().any(|s| s.name == name) {
                    return Err(FormatError::DuplicateSection {
                        line: line_no,
                        name: name.to_string(),
                    });
                }
                sections.push(Section {
                    name: name.to_string(),
                    values: BTreeMap::new(),
                });
                current_key = None;
                continue;
            }

            let Some(section) = sections.last_mut() else {
                return Err(FormatError::MissingSection { line: line_no });
            };

            if let Some((key, key_indent)) = &current_key {
                if indent > *key_indent {
                    if let Some(value) = section.values.get_mut(key) {
                        value.push('\n');
                        value.push_str(content);
                    }
                    continue;
                }
            }

            match content.find([':', '=']) {
                Some(pos) => {
                    let key = content[..pos].trim().to_string();
                    let value = content[pos + 1..].trim().to_string();
                    if section.values.contains_key(&key) {
                        return Err(FormatError::DuplicateKey {
                            line: line_no,
                            section: section.name.clone(),
                            key,
                        });
                    }
                    section.values.insert(key.clone(), value);
                    current_key = Some((key, indent));
                }
                None => {
                    trace!(line = line_no, "ignoring line without a key separator");
                    current_key = None;
                }
            }
        }

        Ok(Self { sections })
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// Sections that name tests, i.e. everything except `DEFAULT`.
    pub fn tests(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(|s| s.name != DEFAULT_SECTION)
    }

    /// Support files declared in `DEFAULT`, as written.
    pub fn support_files(&self) -> Vec<&str> {
        self.section(DEFAULT_SECTION)
            .and_then(|s| s.values.get(SUPPORT_FILES_KEY))
            .map(|value| value.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Resolve against the manifest's own location.
    ///
    /// Every test section counts once and is itself relevant; default support
    /// files are relevant but are not tests.
    pub fn resolve(&self, manifest_path: &str) -> Resolution {
        let dir = path::parent(manifest_path);
        let mut resolution = Resolution::default();
        for section in self.tests() {
            resolution.test_count += 1;
            resolution.relevant_paths.insert(path::join(dir, &section.name));
        }
        for support in self.support_files() {
            resolution.relevant_paths.insert(path::join(dir, support));
        }
        resolution
    }
}

fn section_header(content: &str) -> Option<&str> {
    if content.len() > 2 && content.starts_with('[') && content.ends_with(']') {
        Some(&content[1..content.len() - 1])
    } else {
        None
    }
}

/// Drop everything from the first unescaped `#`; `\#` becomes a literal `#`.
fn strip_comment(line: &str) -> std::borrow::Cow<'_, str> {
    if !line.contains('#') {
        return line.into();
    }
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'#') => {
                out.push('#');
                chars.next();
            }
            '#' => break,
            _ => out.push(c),
        }
    }
    out.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_support_files_and_one_test() {
        let manifest =
            TabularManifest::parse("[DEFAULT]\nsupport-files: x.js\n  y.js\n\n[a/b.html]\n")
                .unwrap();
        let resolution = manifest.resolve("dir/mochitest.ini");
        assert_eq!(resolution.test_count, 1);
        let expected: Vec<&str> = vec!["dir/a/b.html", "dir/x.js", "dir/y.js"];
        assert_eq!(
            resolution.relevant_paths.iter().map(String::as_str).collect::<Vec<_>>(),
            expected
        );
    }

    #[test]
    fn continuation_lines_join_with_newline() {
        let text = "[DEFAULT]\nsupport-files =\n  a.js\n  b.js\nhead = head.js\n";
        let manifest = TabularManifest::parse(text).unwrap();
        let default = manifest.section("DEFAULT").unwrap();
        assert_eq!(default.values["support-files"], "\na.js\nb.js");
        assert_eq!(default.values["head"], "head.js");
    }

    #[test]
    fn blank_line_ends_continuation() {
        let text = "[DEFAULT]\nsupport-files = a.js\n\n  stray: value\n";
        let manifest = TabularManifest::parse(text).unwrap();
        let default = manifest.section("DEFAULT").unwrap();
        assert_eq!(default.values["support-files"], "a.js");
        assert_eq!(default.values["stray"], "value");
    }

    #[test]
    fn comment_only_line_ends_continuation() {
        let text = "[DEFAULT]\nsupport-files = a.js\n  # b.js\n  c.js: x\n";
        let manifest = TabularManifest::parse(text).unwrap();
        let default = manifest.section("DEFAULT").unwrap();
        assert_eq!(default.values["support-files"], "a.js");
        assert_eq!(default.values["c.js"], "x");
    }

    #[test]
    fn comments_are_stripped_and_escapes_kept() {
        let text = "[test_a.html] # the test\nskip-if = os == 'win' # bug 1\nlabel = issue \\#4\n";
        let manifest = TabularManifest::parse(text).unwrap();
        let section = manifest.section("test_a.html").unwrap();
        assert_eq!(section.values["skip-if"], "os == 'win'");
        assert_eq!(section.values["label"], "issue #4");
    }

    #[test]
    fn first_separator_wins() {
        let manifest = TabularManifest::parse("[t.html]\nskip-if = a:b\nfoo: x=y\n").unwrap();
        let section = manifest.section("t.html").unwrap();
        assert_eq!(section.values["skip-if"], "a:b");
        assert_eq!(section.values["foo"], "x=y");
    }

    #[test]
    fn duplicate_section_fails() {
        let err = TabularManifest::parse("[a.html]\n[b.html]\n[a.html]\n").unwrap_err();
        assert_eq!(
            err,
            FormatError::DuplicateSection {
                line: 3,
                name: "a.html".into()
            }
        );
    }

    #[test]
    fn duplicate_key_fails() {
        let err = TabularManifest::parse("[a.html]\nskip-if = a\nskip-if = b\n").unwrap_err();
        assert!(matches!(err, FormatError::DuplicateKey { line: 3, .. }));
    }

    #[test]
    fn content_before_section_fails() {
        let err = TabularManifest::parse("# header\nsupport-files = a.js\n[a.html]\n").unwrap_err();
        assert_eq!(err, FormatError::MissingSection { line: 2 });
    }

    #[test]
    fn support_files_are_normalized() {
        let manifest =
            TabularManifest::parse("[DEFAULT]\nsupport-files = ../shared/head.js\n").unwrap();
        let resolution = manifest.resolve("dom/tests/mochitest.ini");
        assert_eq!(resolution.test_count, 0);
        assert!(resolution.relevant_paths.contains("dom/shared/head.js"));
    }

    #[test]
    fn top_level_manifest() {
        let manifest = TabularManifest::parse("[test_x.html]\n").unwrap();
        let resolution = manifest.resolve("mochitest.ini");
        assert!(resolution.relevant_paths.contains("test_x.html"));
    }

    #[test]
    fn invalid_utf8_fails() {
        assert_eq!(
            TabularManifest::parse_bytes(&[b'[', 0xff, b']']).unwrap_err(),
            FormatError::InvalidUtf8
        );
    }
}
