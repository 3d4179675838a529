//! Core types for the operation engine.

use serde_json::{Map, Value};
use thiserror::Error;

pub use packdoc_path::{Path, PathError};

// ── Errors ────────────────────────────────────────────────────────────────

/// Error produced while applying a single operation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OpError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("KEY_ALREADY_EXISTS: \"{path}\" already holds a {found}")]
    KeyAlreadyExists { path: String, found: &'static str },
    #[error("NOT_AN_OBJECT: update target at \"{path}\" is a {found}, not a map")]
    NotAnObject { path: String, found: &'static str },
    #[error("TYPE_MISMATCH: cannot merge a {payload} into the {target} at \"{path}\"")]
    MergeKindMismatch {
        path: String,
        target: &'static str,
        payload: &'static str,
    },
    #[error("ASSERTION_FAILED: {message} at \"{path}\"")]
    AssertionFailed {
        path: String,
        message: String,
        expected: Option<Value>,
        actual: Option<Value>,
    },
    #[error("INVALID_OPERATION: {0}")]
    Invalid(String),
}

/// Error produced by batch application: the failing zero-based index plus
/// the underlying operation error.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("operation [{index}] failed: {source}")]
pub struct BatchError {
    pub index: usize,
    #[source]
    pub source: OpError,
}

// ── Merge strategy ────────────────────────────────────────────────────────

/// How `merge` combines two sequences. Maps are always shallow-merged;
/// sequences currently support only concatenation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    #[default]
    Append,
}

impl MergeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStrategy::Append => "append",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, OpError> {
        match s {
            "append" => Ok(MergeStrategy::Append),
            other => Err(OpError::Invalid(format!(
                "unknown merge strategy: \"{other}\""
            ))),
        }
    }
}

// ── Op enum ───────────────────────────────────────────────────────────────

/// A declarative mutation instruction targeting one path in the document.
///
/// Every variant is pure: applicators receive a copy of the document and
/// the original is never touched.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Set an absent key, or append to the sequence already stored there.
    Add { path: Path, value: Value },
    /// Remove an existing key or sequence element.
    Delete { path: Path },
    /// Shallow-merge field overrides into the map at the path. An empty
    /// path updates root-level fields.
    Update {
        path: Path,
        updates: Map<String, Value>,
    },
    /// Combine the value at the path with a payload of the same container
    /// kind: maps shallow-merge (payload wins), sequences concatenate.
    Merge {
        path: Path,
        value: Value,
        strategy: MergeStrategy,
    },
    /// Add semantics, but a no-op when the key is present or the sequence
    /// already contains a structurally equal element.
    AddUnique { path: Path, value: Value },
    /// Mutates nothing; fails the batch unless the expectations hold.
    Assert {
        path: Path,
        equals: Option<Value>,
        exists: Option<bool>,
    },
}

impl Op {
    /// The wire-format action name.
    pub fn action(&self) -> &'static str {
        match self {
            Op::Add { .. } => "add",
            Op::Delete { .. } => "delete",
            Op::Update { .. } => "update",
            Op::Merge { .. } => "merge",
            Op::AddUnique { .. } => "add_unique",
            Op::Assert { .. } => "assert",
        }
    }

    /// The target path of the operation.
    pub fn path(&self) -> &Path {
        match self {
            Op::Add { path, .. } => path,
            Op::Delete { path } => path,
            Op::Update { path, .. } => path,
            Op::Merge { path, .. } => path,
            Op::AddUnique { path, .. } => path,
            Op::Assert { path, .. } => path,
        }
    }

    /// True for operations that can change the document.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Op::Assert { .. })
    }

    /// The value payload carried by the operation, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Op::Add { value, .. } | Op::Merge { value, .. } | Op::AddUnique { value, .. } => {
                Some(value)
            }
            _ => None,
        }
    }
}
