//! Build-declaration (`moz.build`) parsing.
//!
//! Only statements of the form `<TOKEN> += [ "a", "b", ]` are recognised,
//! where `<TOKEN>` names a suite's manifest list. Everything else in the file
//! is tokenized and skipped. Once a suite token has been seen the statement
//! must follow that shape exactly; anything else is a [`FormatError`].

use std::collections::BTreeMap;

use testtopo_types::{path, SuiteKind};
use tracing::trace;

use crate::error::{decode, FormatError, FormatResult};

/// Manifest paths declared by one build file, per suite, in declaration order.
pub type BuildDeclaration = BTreeMap<SuiteKind, Vec<String>>;

/// Returns `true` if `data` mentions any suite manifest token.
///
/// This is a byte scan; it lets the caller skip tokenizing the large majority
/// of build files, which declare no test manifests at all.
pub fn mentions_manifests(data: &[u8]) -> bool {
    SuiteKind::MANIFEST_BACKED
        .iter()
        .filter_map(SuiteKind::build_token)
        .any(|token| contains(data, token.as_bytes()))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Parse the build file at `decl_path`.
///
/// Each listed string is joined to the build file's directory and
/// normalized, so the result holds repo-relative manifest paths.
pub fn parse_build_declaration(decl_path: &str, data: &[u8]) -> FormatResult<BuildDeclaration> {
    let mut entries = BuildDeclaration::new();
    if !mentions_manifests(data) {
        return Ok(entries);
    }
    let text = decode(data)?;
    let dir = path::parent(decl_path);
    let mut lexer = Lexer::new(text);
    let mut state = State::Idle;

    while let Some(token) = lexer.next_token()? {
        let line = token.line;
        state = match (state, token.kind) {
            (State::Idle, Tok::Name(name)) => match SuiteKind::from_build_token(name) {
                Some(kind) => State::AfterName(kind),
                None => State::Idle,
            },
            (State::Idle, _) => State::Idle,

            (s @ (State::AfterName(_) | State::AfterOp(_)), Tok::Newline) => s,
            (State::AfterName(kind), Tok::Op("+=")) => State::AfterOp(kind),
            (State::AfterName(_), other) => return Err(unexpected(line, "`+=`", &other)),
            (State::AfterOp(kind), Tok::Op("[")) => State::BeforeEntry(kind),
            (State::AfterOp(_), other) => return Err(unexpected(line, "`[`", &other)),

            (s @ (State::BeforeEntry(_) | State::AfterEntry(_)), Tok::Newline) => s,
            (State::BeforeEntry(kind), Tok::Str(value)) => {
                let manifest = path::join(dir, &value);
                trace!(%manifest, suite = %kind, "declared manifest");
                entries.entry(kind).or_default().push(manifest);
                State::AfterEntry(kind)
            }
            (State::BeforeEntry(_) | State::AfterEntry(_), Tok::Op("]")) => State::Idle,
            (State::BeforeEntry(_), other) => {
                return Err(unexpected(line, "a string or `]`", &other))
            }
            (State::AfterEntry(kind), Tok::Op(",")) => State::BeforeEntry(kind),
            (State::AfterEntry(_), other) => return Err(unexpected(line, "`,` or `]`", &other)),
        };
    }

    match state {
        State::Idle => Ok(entries),
        State::AfterName(_) => Err(FormatError::UnexpectedEof { expected: "`+=`" }),
        State::AfterOp(_) => Err(FormatError::UnexpectedEof { expected: "`[`" }),
        State::BeforeEntry(_) | State::AfterEntry(_) => {
            Err(FormatError::UnexpectedEof { expected: "`]`" })
        }
    }
}

#[derive(Clone, Copy)]
enum State {
    Idle,
    AfterName(SuiteKind),
    AfterOp(SuiteKind),
    BeforeEntry(SuiteKind),
    AfterEntry(SuiteKind),
}

fn unexpected(line: usize, expected: &'static str, found: &Tok<'_>) -> FormatError {
    FormatError::UnexpectedToken {
        line,
        expected,
        found: found.describe(),
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum Tok<'a> {
    Name(&'a str),
    /// String literal with its quotes removed. Escapes are kept verbatim.
    Str(String),
    Op(&'a str),
    Number(&'a str),
    Newline,
}

impl Tok<'_> {
    fn describe(&self) -> String {
        match self {
            Tok::Name(name) => format!("name `{name}`"),
            Tok::Str(value) => format!("string {value:?}"),
            Tok::Op(op) => format!("`{op}`"),
            Tok::Number(num) => format!("number `{num}`"),
            Tok::Newline => "end of line".to_string(),
        }
    }
}

struct Token<'a> {
    kind: Tok<'a>,
    line: usize,
}

const TWO_CHAR_OPS: [&str; 14] = [
    "+=", "-=", "*=", "/=", "|=", "&=", "==", "!=", "<=", ">=", "**", "//", "->", ":=",
];

/// A small Python-flavoured tokenizer: enough of the language to walk past
/// arbitrary build-file statements without misreading strings or comments.
struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, line: 1 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn next_token(&mut self) -> FormatResult<Option<Token<'a>>> {
        loop {
            let Some(c) = self.peek() else {
                return Ok(None);
            };
            let line = self.line;
            match c {
                '\n' => {
                    self.pos += 1;
                    self.line += 1;
                    return Ok(Some(Token {
                        kind: Tok::Newline,
                        line,
                    }));
                }
                '#' => {
                    let src = self.src;
                    let rest = &src[self.pos..];
                    self.pos += rest.find('\n').unwrap_or(rest.len());
                }
                '\\' if self.src[self.pos + 1..].starts_with('\n') => {
                    self.pos += 2;
                    self.line += 1;
                }
                c if c.is_whitespace() => self.pos += c.len_utf8(),
                '"' | '\'' => {
                    let value = self.string(c)?;
                    return Ok(Some(Token {
                        kind: Tok::Str(value),
                        line,
                    }));
                }
                c if c.is_alphabetic() || c == '_' => {
                    let name = self.take_while(|c| c.is_alphanumeric() || c == '_');
                    if is_string_prefix(name) {
                        if let Some(quote @ ('"' | '\'')) = self.peek() {
                            let value = self.string(quote)?;
                            return Ok(Some(Token {
                                kind: Tok::Str(value),
                                line,
                            }));
                        }
                    }
                    return Ok(Some(Token {
                        kind: Tok::Name(name),
                        line,
                    }));
                }
                c if c.is_ascii_digit() => {
                    let num =
                        self.take_while(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
                    return Ok(Some(Token {
                        kind: Tok::Number(num),
                        line,
                    }));
                }
                _ => {
                    let src = self.src;
                    let rest = &src[self.pos..];
                    let len = match TWO_CHAR_OPS.iter().find(|op| rest.starts_with(**op)) {
                        Some(op) => op.len(),
                        None => c.len_utf8(),
                    };
                    let op = &rest[..len];
                    self.pos += len;
                    return Ok(Some(Token {
                        kind: Tok::Op(op),
                        line,
                    }));
                }
            }
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let src = self.src;
        let rest = &src[self.pos..];
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    /// Consume a string literal starting at the opening quote.
    fn string(&mut self, quote: char) -> FormatResult<String> {
        let start_line = self.line;
        let src = self.src;
        let rest = &src[self.pos..];
        let triple: String = std::iter::repeat(quote).take(3).collect();
        let (delim, multiline) = if rest.starts_with(&triple) {
            (triple.as_str(), true)
        } else {
            (&rest[..1], false)
        };
        let body_start = delim.len();
        let mut chars = rest[body_start..].char_indices();
        while let Some((idx, c)) = chars.next() {
            match c {
                '\\' => {
                    if let Some((_, '\n')) = chars.next() {
                        self.line += 1;
                    }
                }
                '\n' if !multiline => break,
                '\n' => self.line += 1,
                _ if rest[body_start + idx..].starts_with(delim) => {
                    let value = rest[body_start..body_start + idx].to_string();
                    self.pos += body_start + idx + delim.len();
                    return Ok(value);
                }
                _ => {}
            }
        }
        Err(FormatError::UnterminatedString { line: start_line })
    }
}

fn is_string_prefix(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "f" | "br" | "rb" | "fr" | "rf"
    )
}
