//! Deterministic transformation engine for structured domain-pack
//! documents.
//!
//! A domain pack is a YAML or JSON document describing entities,
//! relationships, extraction patterns, and key terms for one knowledge
//! domain. This crate applies declarative operation batches to such
//! documents atomically: operations are shape-checked, analyzed for
//! safety hazards, applied to a deep copy, re-validated against the
//! schema, and diffed against the original. Any failure at any stage
//! returns the original document untouched.
//!
//! ```
//! use packdoc_engine::{transform, DocFormat};
//! use serde_json::json;
//!
//! let doc = r#"{"name": "legal", "description": "Legal pack", "version": "1.0.0"}"#;
//! let ops = json!([
//!     {"action": "update", "path": [], "updates": {"version": "1.1.0"}}
//! ]);
//! let result = transform(doc, DocFormat::Json, &ops, None, None);
//! assert!(result.success);
//! assert_eq!(result.document["version"], json!("1.1.0"));
//! ```
//!
//! Path addressing, parsing, and resolution live in the companion
//! `packdoc-path` crate.

pub mod diff;
pub mod executor;
pub mod format;
pub mod safety;
pub mod schema;
pub mod transform;

pub use diff::{diff, DiffEntry, DocumentDiff, TypeChange, ValueChange};
pub use executor::{
    get_schema, preview, transform, validate, EngineError, EngineWarning, ExecutionMetadata,
    ExecutionOptions, ExecutionPhase, PreviewResult, TransformationResult, ValidationOutcome,
};
pub use format::{parse_document, serialize_document, DocFormat, FormatError};
pub use safety::{run_safety_checks, IssueCode, SafetyIssue, SafetyReport, Severity};
pub use schema::{FieldRule, FieldSpec, Schema, SchemaError, SchemaViolation, PRIORITY_LEVELS};
pub use transform::{
    apply_batch, apply_op, decode_op, decode_ops, encode_op, encode_ops, validate_operations,
    BatchError, MergeStrategy, Op, OpError, ValidationError,
};
