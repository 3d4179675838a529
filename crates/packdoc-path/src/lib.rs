//! Path-addressing language for domain-pack documents.
//!
//! Paths address locations inside a nested map/sequence/scalar tree using a
//! compact string grammar: dot-separated identifiers denote map keys and
//! `[<digits>]` denotes a sequence index.
//!
//! # Example
//!
//! ```
//! use packdoc_path::{parse_path, Path, Segment};
//!
//! let path = parse_path("entities[0].name").unwrap();
//! assert_eq!(
//!     path.segments(),
//!     &[Segment::key("entities"), Segment::index(0), Segment::key("name")]
//! );
//!
//! // Paths format back to the same string.
//! assert_eq!(path.to_string(), "entities[0].name");
//!
//! // Malformed paths are rejected.
//! assert!(parse_path("a..b").is_err());
//! assert!(parse_path("a[x]").is_err());
//! assert!(parse_path("").is_err());
//! ```

use thiserror::Error;

pub mod resolve;
pub mod types;

pub use resolve::{get, resolve, resolve_parent_mut};
pub use types::{NodeRef, Path, Segment};

/// Maximum allowed path string length.
const MAX_PATH_LENGTH: usize = 1024;

/// Maximum allowed path depth.
const MAX_PATH_DEPTH: usize = 256;

/// Errors produced while parsing or resolving a path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("INVALID_PATH_SYNTAX: {0}")]
    InvalidSyntax(String),
    #[error("PATH_TOO_LONG")]
    TooLong,
    #[error("PATH_NOT_FOUND: {0}")]
    NotFound(String),
    #[error("INDEX_OUT_OF_BOUNDS: index {index} out of range for sequence of length {len} at \"{path}\"")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },
    #[error("TYPE_MISMATCH: expected {expected} at \"{path}\", found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("ROOT_NOT_ADDRESSABLE: the document root cannot be written or deleted through a path")]
    RootWrite,
}

fn syntax(msg: impl Into<String>) -> PathError {
    PathError::InvalidSyntax(msg.into())
}

/// Parse a path string into a [`Path`].
///
/// Grammar: `ident(.ident | [digits])*`, where an identifier is any nonempty
/// run of characters other than `.`, `[` and `]`. A leading `[digits]`
/// (index into a root-level sequence) is also accepted.
///
/// # Errors
///
/// Returns [`PathError::InvalidSyntax`] for empty input, consecutive or
/// trailing separators, non-numeric bracket contents, and unbalanced
/// brackets, so typos like `a..b` are caught rather than silently resolved.
pub fn parse_path(input: &str) -> Result<Path, PathError> {
    if input.is_empty() {
        return Err(syntax("empty path"));
    }
    if input.len() > MAX_PATH_LENGTH {
        return Err(PathError::TooLong);
    }

    let mut segments = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut pos = 0;
    // True when the next token must be an identifier (start of input or
    // just after a dot).
    let mut expect_ident = true;

    while pos < chars.len() {
        match chars[pos] {
            '[' => {
                if expect_ident && !segments.is_empty() {
                    // `a.[0]` — a dot must be followed by an identifier.
                    return Err(syntax(format!(
                        "expected identifier at position {pos}, found '['"
                    )));
                }
                let close = chars[pos..]
                    .iter()
                    .position(|&c| c == ']')
                    .map(|off| pos + off)
                    .ok_or_else(|| syntax("unclosed '['"))?;
                let digits: String = chars[pos + 1..close].iter().collect();
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(syntax(format!(
                        "index must be a non-negative integer, found \"{digits}\""
                    )));
                }
                let index: usize = digits
                    .parse()
                    .map_err(|_| syntax(format!("index \"{digits}\" is too large")))?;
                segments.push(Segment::Index(index));
                pos = close + 1;
                expect_ident = false;
            }
            '.' => {
                if expect_ident || segments.is_empty() {
                    return Err(syntax(format!("unexpected '.' at position {pos}")));
                }
                pos += 1;
                expect_ident = true;
            }
            ']' => {
                return Err(syntax(format!("unexpected ']' at position {pos}")));
            }
            _ => {
                if !expect_ident {
                    // Text directly after `]` without a separator, e.g. `a[0]b`.
                    return Err(syntax(format!(
                        "expected '.' or '[' at position {pos}"
                    )));
                }
                let end = chars[pos..]
                    .iter()
                    .position(|&c| c == '.' || c == '[' || c == ']')
                    .map(|off| pos + off)
                    .unwrap_or(chars.len());
                let ident: String = chars[pos..end].iter().collect();
                segments.push(Segment::Key(ident));
                pos = end;
                expect_ident = false;
            }
        }
    }

    if expect_ident {
        // Input ended right after a dot.
        return Err(syntax("trailing '.'"));
    }
    if segments.len() > MAX_PATH_DEPTH {
        return Err(PathError::TooLong);
    }
    Ok(Path::new(segments))
}

/// Runtime kind name of a document value, used in error messages.
pub fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "sequence",
        serde_json::Value::Object(_) => "map",
    }
}
