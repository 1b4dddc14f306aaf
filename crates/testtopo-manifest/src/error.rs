//! Grammar violations shared by the three manifest formats.

/// A file violates its grammar.
///
/// Callers recover from these locally: the offending file contributes nothing
/// and the failure is reported, but resolution of everything else continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("file is not valid UTF-8")]
    InvalidUtf8,

    #[error("line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: &'static str,
        found: String,
    },

    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },

    #[error("line {line}: content before the first section header")]
    MissingSection { line: usize },

    #[error("line {line}: duplicate section [{name}]")]
    DuplicateSection { line: usize, name: String },

    #[error("line {line}: duplicate key {key:?} in section [{section}]")]
    DuplicateKey {
        line: usize,
        section: String,
        key: String,
    },

    #[error("line {line}: `{directive}` is missing an argument")]
    MissingArgument {
        line: usize,
        directive: &'static str,
    },

    #[error("include of {path} revisits a manifest already resolved")]
    IncludeCycle { path: String },
}

pub type FormatResult<T> = Result<T, FormatError>;

/// Decode manifest bytes as UTF-8.
pub fn decode(data: &[u8]) -> FormatResult<&str> {
    std::str::from_utf8(data).map_err(|_| FormatError::InvalidUtf8)
}
