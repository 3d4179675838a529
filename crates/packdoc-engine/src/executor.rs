//! The atomic executor: the only entry point external callers use.
//!
//! Sequences shape validation, deep copy, schema pre-validation, safety
//! checks, operation application, schema post-validation, and diffing into
//! one all-or-nothing pipeline. Any phase failure short-circuits and
//! returns the original, untouched document with phase-tagged errors.

use std::time::{Duration, Instant};

use indexmap::IndexSet;
use serde_json::Value;

use crate::diff::{diff, DocumentDiff};
use crate::format::{parse_document, serialize_document, DocFormat};
use crate::safety::{run_safety_checks, SafetyIssue};
use crate::schema::{Schema, SchemaViolation};
use crate::transform::{apply_batch, decode_ops, validate_operations, Op};

// ── Phases ────────────────────────────────────────────────────────────────

/// Pipeline phases, in execution order. Every phase except diff
/// computation is a possible terminal failure state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPhase {
    InputValidation,
    OperationCount,
    DeepCopy,
    PreValidation,
    SafetyChecks,
    ApplyOperations,
    PostValidation,
    DiffComputation,
}

impl ExecutionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionPhase::InputValidation => "input_validation",
            ExecutionPhase::OperationCount => "operation_count",
            ExecutionPhase::DeepCopy => "deep_copy",
            ExecutionPhase::PreValidation => "pre_validation",
            ExecutionPhase::SafetyChecks => "safety_checks",
            ExecutionPhase::ApplyOperations => "apply_operations",
            ExecutionPhase::PostValidation => "post_validation",
            ExecutionPhase::DiffComputation => "diff_computation",
        }
    }
}

impl std::fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Options and results ───────────────────────────────────────────────────

/// Per-invocation execution options.
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Promote the presence of any warning into a blocking condition.
    pub strict_mode: bool,
    /// Create missing intermediate containers while resolving write paths.
    pub auto_create_paths: bool,
    /// Hard cap on the number of operations per batch.
    pub max_operations: usize,
    /// Batches larger than this trigger a single bulk-change warning.
    pub bulk_threshold: usize,
    /// Path prefixes that may only be touched with a warning.
    pub forbidden_paths: Vec<String>,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        ExecutionOptions {
            strict_mode: false,
            auto_create_paths: true,
            max_operations: 100,
            bulk_threshold: 10,
            forbidden_paths: Vec::new(),
        }
    }
}

/// A phase-tagged pipeline error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub phase: ExecutionPhase,
    pub code: String,
    pub message: String,
    pub path: Option<String>,
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.phase, self.code, self.message)
    }
}

/// A non-blocking finding surfaced alongside the result.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineWarning {
    pub code: String,
    pub message: String,
    pub path: Option<String>,
    pub context: Option<Value>,
}

impl From<&SafetyIssue> for EngineWarning {
    fn from(issue: &SafetyIssue) -> Self {
        EngineWarning {
            code: issue.code.as_str().to_string(),
            message: issue.message.clone(),
            path: issue.path.clone(),
            context: issue.context.clone(),
        }
    }
}

/// Execution bookkeeping attached to every result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionMetadata {
    pub operation_count: usize,
    pub duration: Duration,
    pub failed_phase: Option<ExecutionPhase>,
}

/// The outcome of a full pipeline run.
///
/// On failure, `document` is the original parsed document (or null when
/// the input never parsed) and `text` is absent; retrying with corrected
/// operations is always safe.
#[derive(Debug, Clone)]
pub struct TransformationResult {
    pub success: bool,
    pub document: Value,
    /// The document re-serialized in the input format, on success.
    pub text: Option<String>,
    pub diff: DocumentDiff,
    pub errors: Vec<EngineError>,
    pub warnings: Vec<EngineWarning>,
    pub affected_paths: Vec<String>,
    pub metadata: ExecutionMetadata,
}

/// A dry run's outcome: everything the caller needs to decide, no document.
#[derive(Debug, Clone)]
pub struct PreviewResult {
    pub would_succeed: bool,
    pub diff: DocumentDiff,
    pub errors: Vec<EngineError>,
    pub warnings: Vec<EngineWarning>,
    pub affected_paths: Vec<String>,
}

/// Schema-only validation outcome.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<SchemaViolation>,
}

// ── Entry points ──────────────────────────────────────────────────────────

/// The built-in schema, for callers building operation-authoring UIs.
pub fn get_schema() -> Schema {
    Schema::domain_pack()
}

/// Schema check only; no mutation.
pub fn validate(
    document_text: &str,
    format: DocFormat,
    schema: Option<&Schema>,
) -> ValidationOutcome {
    let doc = match parse_document(document_text, format) {
        Ok(doc) => doc,
        Err(e) => {
            return ValidationOutcome {
                valid: false,
                errors: vec![SchemaViolation {
                    path: String::new(),
                    message: e.to_string(),
                }],
            }
        }
    };
    let default_schema;
    let schema = match schema {
        Some(s) => s,
        None => {
            default_schema = Schema::domain_pack();
            &default_schema
        }
    };
    let errors = schema.check(&doc);
    ValidationOutcome {
        valid: errors.is_empty(),
        errors,
    }
}

/// Dry run: the identical pipeline, reporting only whether it would
/// succeed, never handing back a mutated document.
pub fn preview(
    document_text: &str,
    format: DocFormat,
    operations: &Value,
    schema: Option<&Schema>,
    options: Option<&ExecutionOptions>,
) -> PreviewResult {
    let result = transform(document_text, format, operations, schema, options);
    PreviewResult {
        would_succeed: result.success,
        diff: result.diff,
        errors: result.errors,
        warnings: result.warnings,
        affected_paths: result.affected_paths,
    }
}

/// Run the full transformation pipeline.
pub fn transform(
    document_text: &str,
    format: DocFormat,
    operations: &Value,
    schema: Option<&Schema>,
    options: Option<&ExecutionOptions>,
) -> TransformationResult {
    let start = Instant::now();
    let default_schema;
    let schema = match schema {
        Some(s) => s,
        None => {
            default_schema = Schema::domain_pack();
            &default_schema
        }
    };
    let default_options;
    let options = match options {
        Some(o) => o,
        None => {
            default_options = ExecutionOptions::default();
            &default_options
        }
    };

    // ── InputValidation: document text ──
    let original = match parse_document(document_text, format) {
        Ok(doc) => doc,
        Err(e) => {
            return failure(
                Value::Null,
                Vec::new(),
                Vec::new(),
                0,
                start,
                vec![EngineError {
                    phase: ExecutionPhase::InputValidation,
                    code: "DOCUMENT_PARSE_FAILED".into(),
                    message: e.to_string(),
                    path: None,
                }],
            )
        }
    };

    // ── InputValidation: operations shape ──
    if let Err(e) = validate_operations(operations) {
        return failure(
            original,
            Vec::new(),
            Vec::new(),
            0,
            start,
            vec![EngineError {
                phase: ExecutionPhase::InputValidation,
                code: "INVALID_OPERATIONS".into(),
                message: e.to_string(),
                path: None,
            }],
        );
    }
    let ops = match decode_ops(operations) {
        Ok(ops) => ops,
        Err(e) => {
            return failure(
                original,
                Vec::new(),
                Vec::new(),
                0,
                start,
                vec![EngineError {
                    phase: ExecutionPhase::InputValidation,
                    code: "INVALID_OPERATIONS".into(),
                    message: e.to_string(),
                    path: None,
                }],
            )
        }
    };

    let affected_paths = collect_affected_paths(&ops);

    // ── OperationCount ──
    if ops.len() > options.max_operations {
        return failure(
            original,
            affected_paths,
            Vec::new(),
            ops.len(),
            start,
            vec![EngineError {
                phase: ExecutionPhase::OperationCount,
                code: "OPERATION_LIMIT_EXCEEDED".into(),
                message: format!(
                    "batch of {} operations exceeds the limit of {}",
                    ops.len(),
                    options.max_operations
                ),
                path: None,
            }],
        );
    }

    // ── DeepCopy: mutate a copy, never the caller's document ──
    let working = original.clone();

    // ── PreValidation ──
    let violations = schema.check(&original);
    if !violations.is_empty() {
        let errors = violations
            .into_iter()
            .map(|v| EngineError {
                phase: ExecutionPhase::PreValidation,
                code: "SCHEMA_VIOLATION".into(),
                message: v.message,
                path: Some(v.path),
            })
            .collect();
        return failure(original, affected_paths, Vec::new(), ops.len(), start, errors);
    }

    // ── SafetyChecks ──
    let report = run_safety_checks(&original, &ops, schema, options);
    let warnings: Vec<EngineWarning> = report.warnings().map(EngineWarning::from).collect();
    if report.has_blocking_errors() {
        let errors = report
            .errors()
            .map(|issue| EngineError {
                phase: ExecutionPhase::SafetyChecks,
                code: issue.code.as_str().to_string(),
                message: issue.message.clone(),
                path: issue.path.clone(),
            })
            .collect();
        return failure(original, affected_paths, warnings, ops.len(), start, errors);
    }
    if options.strict_mode && !warnings.is_empty() {
        let errors = vec![EngineError {
            phase: ExecutionPhase::SafetyChecks,
            code: "STRICT_MODE_VIOLATION".into(),
            message: format!(
                "strict mode: {} warning(s) treated as blocking",
                warnings.len()
            ),
            path: None,
        }];
        return failure(original, affected_paths, warnings, ops.len(), start, errors);
    }

    // ── ApplyOperations ──
    let mutated = match apply_batch(working, &ops, options.auto_create_paths) {
        Ok(doc) => doc,
        Err(e) => {
            let path = ops.get(e.index).map(|op| op.path().to_string());
            return failure(
                original,
                affected_paths,
                warnings,
                ops.len(),
                start,
                vec![EngineError {
                    phase: ExecutionPhase::ApplyOperations,
                    code: "OPERATION_FAILED".into(),
                    message: e.to_string(),
                    path,
                }],
            );
        }
    };

    // ── PostValidation: a failure here is the engine's own output being
    // invalid, which callers should treat as more severe than bad input. ──
    let post_violations = schema.check(&mutated);
    if !post_violations.is_empty() {
        let errors = post_violations
            .into_iter()
            .map(|v| EngineError {
                phase: ExecutionPhase::PostValidation,
                code: "POST_VALIDATION_FAILED".into(),
                message: format!("transformed document violates the schema: {}", v.message),
                path: Some(v.path),
            })
            .collect();
        return failure(original, affected_paths, warnings, ops.len(), start, errors);
    }

    // ── DiffComputation ──
    let diff = diff(&original, &mutated);

    // Re-serialization trouble degrades to a warning: the mutation itself
    // already succeeded.
    let mut warnings = warnings;
    let text = match serialize_document(&mutated, format) {
        Ok(text) => Some(text),
        Err(e) => {
            warnings.push(EngineWarning {
                code: "RESULT_SERIALIZE_FAILED".into(),
                message: e.to_string(),
                path: None,
                context: None,
            });
            None
        }
    };

    TransformationResult {
        success: true,
        document: mutated,
        text,
        diff,
        errors: Vec::new(),
        warnings,
        affected_paths,
        metadata: ExecutionMetadata {
            operation_count: ops.len(),
            duration: start.elapsed(),
            failed_phase: None,
        },
    }
}

fn collect_affected_paths(ops: &[Op]) -> Vec<String> {
    let mut set = IndexSet::new();
    for op in ops {
        set.insert(op.path().to_string());
    }
    set.into_iter().collect()
}

fn failure(
    document: Value,
    affected_paths: Vec<String>,
    warnings: Vec<EngineWarning>,
    operation_count: usize,
    start: Instant,
    errors: Vec<EngineError>,
) -> TransformationResult {
    let failed_phase = errors.first().map(|e| e.phase);
    TransformationResult {
        success: false,
        document,
        text: None,
        diff: DocumentDiff::default(),
        errors,
        warnings,
        affected_paths,
        metadata: ExecutionMetadata {
            operation_count,
            duration: start.elapsed(),
            failed_phase,
        },
    }
}
