//! Directive (`reftest.list` / `crashtest.list`) manifest parsing.
//!
//! Each non-comment line holds at most one directive, optionally preceded by
//! condition tokens such as `fails-if(winWidget&&isDebugBuild)` or `skip`.
//! Conditions may contain spaces inside parentheses and are discarded.

use testtopo_types::path;
use tracing::trace;

use crate::error::{decode, FormatError, FormatResult};
use crate::Resolution;

/// What a single directive manifest declares, before include resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectiveManifest {
    /// Tests counted and file paths referenced by this file alone.
    pub resolution: Resolution,
    /// Included manifests, normalized, in file order.
    pub includes: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Keyword {
    UrlPrefix,
    Include,
    Load,
    Equal,
    NotEqual,
    Print,
}

impl Keyword {
    fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "url-prefix" => Self::UrlPrefix,
            "include" => Self::Include,
            "load" => Self::Load,
            "==" => Self::Equal,
            "!=" => Self::NotEqual,
            "print" => Self::Print,
            _ => return None,
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::UrlPrefix => "url-prefix",
            Self::Include => "include",
            Self::Load => "load",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Print => "print",
        }
    }

    fn arity(self) -> usize {
        match self {
            Self::UrlPrefix | Self::Include | Self::Load => 1,
            Self::Equal | Self::NotEqual | Self::Print => 2,
        }
    }
}

impl DirectiveManifest {
    pub fn parse_bytes(manifest_path: &str, data: &[u8]) -> FormatResult<Self> {
        Self::parse(manifest_path, decode(data)?)
    }

    pub fn parse(manifest_path: &str, text: &str) -> FormatResult<Self> {
        let dir = path::parent(manifest_path);
        let mut manifest = Self::default();
        let mut url_prefix = String::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let tokens = split_tokens(line);
            let Some(pos) = tokens.iter().position(|t| Keyword::parse(t).is_some()) else {
                trace!(line = line_no, "no directive on line");
                continue;
            };
            let Some(keyword) = Keyword::parse(tokens[pos]) else {
                continue;
            };
            let args = &tokens[pos + 1..];
            if args.len() < keyword.arity() {
                return Err(FormatError::MissingArgument {
                    line: line_no,
                    directive: keyword.as_str(),
                });
            }

            match keyword {
                Keyword::UrlPrefix => url_prefix = args[0].to_string(),
                Keyword::Include => manifest.includes.push(path::join(dir, args[0])),
                _ => {
                    manifest.resolution.test_count += 1;
                    for url in &args[..keyword.arity()] {
                        if let Some(resolved) = resolve_url(dir, &url_prefix, url) {
                            manifest.resolution.relevant_paths.insert(resolved);
                        }
                    }
                }
            }
        }

        Ok(manifest)
    }
}

/// Resolve a test URL to a repo path, or `None` for scheme URLs.
fn resolve_url(dir: &str, prefix: &str, url: &str) -> Option<String> {
    if url.contains(':') {
        return None;
    }
    let url = url.split('#').next().unwrap_or_default();
    let url = url.split('?').next().unwrap_or_default();
    let full = format!("{prefix}{url}");
    if full.is_empty() || full.contains(':') {
        return None;
    }
    Some(path::join(dir, &full))
}

/// Split on whitespace outside parentheses, stopping at a `#` comment.
fn split_tokens(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;

    for (i, c) in line.char_indices() {
        match c {
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    tokens.push(&line[s..i]);
                }
            }
            '#' if depth == 0 && start.is_none() => return tokens,
            _ => {
                if start.is_none() {
                    start = Some(i);
                }
                match c {
                    '(' => depth += 1,
                    ')' => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
        }
    }
    if let Some(s) = start {
        tokens.push(&line[s..]);
    }
    tokens
}
