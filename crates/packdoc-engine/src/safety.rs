//! Pre-mutation safety analysis.
//!
//! Runs over the proposed operation list against the unmutated document
//! and the schema, before anything is applied. Findings are collected —
//! never short-circuited — so the caller sees the complete picture in one
//! pass. Blocking errors stop the pipeline; warnings are advisory unless
//! strict mode promotes them.

use packdoc_path::{parse_path, resolve, PathError, Segment};
use serde_json::{json, Value};

use crate::executor::ExecutionOptions;
use crate::schema::{rule_accepts_kind, Schema};
use crate::transform::Op;

// ── Issue model ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Machine-readable finding codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueCode {
    RequiredFieldDeletion,
    SchemaTypeConflict,
    BulkChangeWarning,
    OverwriteWarning,
    CircularReference,
    InvalidIndexAccess,
    ForbiddenPathWarning,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::RequiredFieldDeletion => "REQUIRED_FIELD_DELETION",
            IssueCode::SchemaTypeConflict => "SCHEMA_TYPE_CONFLICT",
            IssueCode::BulkChangeWarning => "BULK_CHANGE_WARNING",
            IssueCode::OverwriteWarning => "OVERWRITE_WARNING",
            IssueCode::CircularReference => "CIRCULAR_REFERENCE",
            IssueCode::InvalidIndexAccess => "INVALID_INDEX_ACCESS",
            IssueCode::ForbiddenPathWarning => "FORBIDDEN_PATH_WARNING",
        }
    }
}

impl std::fmt::Display for IssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding: severity, code, human message, and optional location plus
/// structured context.
#[derive(Debug, Clone, PartialEq)]
pub struct SafetyIssue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
    pub path: Option<String>,
    pub context: Option<Value>,
}

/// All findings from one safety pass.
#[derive(Debug, Clone, Default)]
pub struct SafetyReport {
    pub issues: Vec<SafetyIssue>,
}

impl SafetyReport {
    pub fn has_blocking_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &SafetyIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &SafetyIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    fn error(&mut self, code: IssueCode, message: String, path: Option<String>) {
        self.issues.push(SafetyIssue {
            severity: Severity::Error,
            code,
            message,
            path,
            context: None,
        });
    }

    fn warning(
        &mut self,
        code: IssueCode,
        message: String,
        path: Option<String>,
        context: Option<Value>,
    ) {
        self.issues.push(SafetyIssue {
            severity: Severity::Warning,
            code,
            message,
            path,
            context,
        });
    }
}

// ── The pass ──────────────────────────────────────────────────────────────

/// Analyze `ops` against the current document and schema.
pub fn run_safety_checks(
    doc: &Value,
    ops: &[Op],
    schema: &Schema,
    options: &ExecutionOptions,
) -> SafetyReport {
    let mut report = SafetyReport::default();

    // Batch-level: one warning for large batches, however many ops follow.
    if ops.len() > options.bulk_threshold {
        report.warning(
            IssueCode::BulkChangeWarning,
            format!(
                "batch of {} operations exceeds the bulk threshold of {}",
                ops.len(),
                options.bulk_threshold
            ),
            None,
            Some(json!({
                "count": ops.len(),
                "threshold": options.bulk_threshold
            })),
        );
    }

    let forbidden: Vec<_> = options
        .forbidden_paths
        .iter()
        .filter_map(|raw| parse_path(raw).ok().map(|p| (raw.clone(), p)))
        .collect();

    for op in ops {
        check_required_deletion(&mut report, op, schema);
        check_schema_kind(&mut report, op, schema);
        check_overwrite(&mut report, doc, op);
        check_circular(&mut report, doc, op);
        check_index_access(&mut report, doc, op);

        for (raw, prefix) in &forbidden {
            if prefix.is_prefix_of(op.path()) {
                report.warning(
                    IssueCode::ForbiddenPathWarning,
                    format!(
                        "operation touches forbidden path prefix \"{raw}\""
                    ),
                    Some(op.path().to_string()),
                    None,
                );
            }
        }
    }

    report
}

fn check_required_deletion(report: &mut SafetyReport, op: &Op, schema: &Schema) {
    let Op::Delete { path } = op else { return };
    let Some(Segment::Key(first)) = path.first() else {
        return;
    };
    if schema.required_fields().any(|f| f == first) {
        report.error(
            IssueCode::RequiredFieldDeletion,
            format!("deleting schema-required field \"{first}\""),
            Some(path.to_string()),
        );
    }
}

fn check_schema_kind(report: &mut SafetyReport, op: &Op, schema: &Schema) {
    match op {
        Op::Add { path, value } | Op::AddUnique { path, value } => {
            // Only top-level fields have a declared kind to disagree with.
            if path.len() != 1 {
                return;
            }
            let Some(Segment::Key(field)) = path.first() else {
                return;
            };
            if let Some(spec) = schema.field(field) {
                if !rule_accepts_kind(&spec.rule, value) {
                    report.error(
                        IssueCode::SchemaTypeConflict,
                        format!(
                            "value kind {} conflicts with the declared shape of \"{field}\"",
                            packdoc_path::kind_of(value)
                        ),
                        Some(path.to_string()),
                    );
                }
            }
        }
        Op::Update { path, updates } if path.is_root() => {
            for (field, value) in updates {
                if let Some(spec) = schema.field(field) {
                    if !rule_accepts_kind(&spec.rule, value) {
                        report.error(
                            IssueCode::SchemaTypeConflict,
                            format!(
                                "update kind {} conflicts with the declared shape of \"{field}\"",
                                packdoc_path::kind_of(value)
                            ),
                            Some(field.clone()),
                        );
                    }
                }
            }
        }
        _ => {}
    }
}

fn check_overwrite(report: &mut SafetyReport, doc: &Value, op: &Op) {
    let Op::Add { path, .. } = op else { return };
    let Ok(node) = resolve(doc, path, true) else {
        return;
    };
    if node.exists {
        let current = node.value.cloned().unwrap_or(Value::Null);
        let verb = if current.is_array() { "extends" } else { "overwrites" };
        report.warning(
            IssueCode::OverwriteWarning,
            format!("add at \"{path}\" {verb} an existing value"),
            Some(path.to_string()),
            Some(json!({"current": current})),
        );
    }
}

fn check_circular(report: &mut SafetyReport, doc: &Value, op: &Op) {
    // Owned values have no reference identity; a container payload that is
    // structurally equal to the current root would nest the document inside
    // itself, which is the same hazard.
    let is_root_like = |v: &Value| (v.is_object() || v.is_array()) && v == doc;

    let hit = match op {
        Op::Update { updates, .. } => updates.values().any(is_root_like),
        _ => op.value().is_some_and(is_root_like),
    };
    if hit {
        report.error(
            IssueCode::CircularReference,
            "value is the document root itself; applying it would create a cycle".to_string(),
            Some(op.path().to_string()),
        );
    }
}

fn check_index_access(report: &mut SafetyReport, doc: &Value, op: &Op) {
    let Err(e) = resolve(doc, op.path(), true) else {
        return;
    };
    match e {
        PathError::TypeMismatch {
            expected: "sequence",
            path,
            found,
        } => {
            report.error(
                IssueCode::InvalidIndexAccess,
                format!("index segment applied to a {found} at \"{path}\""),
                Some(op.path().to_string()),
            );
        }
        PathError::IndexOutOfBounds { index, len, .. }
            if matches!(op, Op::Delete { .. } | Op::Update { .. } | Op::Merge { .. }) =>
        {
            report.error(
                IssueCode::InvalidIndexAccess,
                format!("index {index} is out of range for a sequence of length {len}"),
                Some(op.path().to_string()),
            );
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::MergeStrategy;
    use packdoc_path::Path;
    use serde_json::json;

    fn p(s: &str) -> Path {
        parse_path(s).unwrap()
    }

    fn doc() -> Value {
        json!({
            "name": "T",
            "description": "T",
            "version": "1.0.0",
            "key_terms": ["x"],
            "entities": [{"name": "A"}]
        })
    }

    fn run(ops: &[Op], options: &ExecutionOptions) -> SafetyReport {
        run_safety_checks(&doc(), ops, &Schema::domain_pack(), options)
    }

    #[test]
    fn deleting_required_field_blocks() {
        let report = run(
            &[Op::Delete { path: p("name") }],
            &ExecutionOptions::default(),
        );
        assert!(report.has_blocking_errors());
        let issue = report.errors().next().unwrap();
        assert_eq!(issue.code, IssueCode::RequiredFieldDeletion);
        assert_eq!(issue.path.as_deref(), Some("name"));
    }

    #[test]
    fn deleting_optional_section_is_fine() {
        let report = run(
            &[Op::Delete { path: p("key_terms") }],
            &ExecutionOptions::default(),
        );
        assert!(!report.has_blocking_errors());
    }

    #[test]
    fn schema_kind_conflict_blocks() {
        let report = run(
            &[Op::Add { path: p("entities"), value: json!("not-a-list") }],
            &ExecutionOptions::default(),
        );
        // entities already exists -> overwrite warning, plus the kind error
        assert!(report.has_blocking_errors());
        assert!(report
            .errors()
            .any(|i| i.code == IssueCode::SchemaTypeConflict));
    }

    #[test]
    fn update_kind_conflict_blocks() {
        let mut updates = serde_json::Map::new();
        updates.insert("version".into(), json!(2));
        let report = run(
            &[Op::Update { path: Path::root(), updates }],
            &ExecutionOptions::default(),
        );
        assert!(report
            .errors()
            .any(|i| i.code == IssueCode::SchemaTypeConflict));
    }

    #[test]
    fn bulk_warning_is_emitted_once() {
        let ops: Vec<Op> = (0..15)
            .map(|i| Op::Add { path: p(&format!("metadata.k{i}")), value: json!(i) })
            .collect();
        let options = ExecutionOptions {
            bulk_threshold: 10,
            ..Default::default()
        };
        let report = run(&ops, &options);
        let bulk: Vec<_> = report
            .issues
            .iter()
            .filter(|i| i.code == IssueCode::BulkChangeWarning)
            .collect();
        assert_eq!(bulk.len(), 1);
        assert_eq!(
            bulk[0].context,
            Some(json!({"count": 15, "threshold": 10}))
        );
    }

    #[test]
    fn add_over_existing_key_warns() {
        let report = run(
            &[Op::Add { path: p("key_terms"), value: json!("y") }],
            &ExecutionOptions::default(),
        );
        assert!(!report.has_blocking_errors());
        let issue = report.warnings().next().unwrap();
        assert_eq!(issue.code, IssueCode::OverwriteWarning);
        assert_eq!(issue.context, Some(json!({"current": ["x"]})));
    }

    #[test]
    fn root_valued_payload_blocks() {
        let report = run(
            &[Op::Merge {
                path: p("metadata"),
                value: doc(),
                strategy: MergeStrategy::Append,
            }],
            &ExecutionOptions::default(),
        );
        assert!(report
            .errors()
            .any(|i| i.code == IssueCode::CircularReference));
    }

    #[test]
    fn index_over_non_sequence_blocks() {
        let report = run(
            &[Op::Delete { path: p("name[0]") }],
            &ExecutionOptions::default(),
        );
        assert!(report
            .errors()
            .any(|i| i.code == IssueCode::InvalidIndexAccess));
    }

    #[test]
    fn out_of_range_delete_blocks() {
        let report = run(
            &[Op::Delete { path: p("entities[5]") }],
            &ExecutionOptions::default(),
        );
        assert!(report
            .errors()
            .any(|i| i.code == IssueCode::InvalidIndexAccess));
    }

    #[test]
    fn out_of_range_add_is_not_flagged_here() {
        // Appending at index == len is legal for add; the operation engine
        // is the authority for anything beyond that.
        let report = run(
            &[Op::Add { path: p("entities[1]"), value: json!({"name": "B"}) }],
            &ExecutionOptions::default(),
        );
        assert!(!report.has_blocking_errors());
    }

    #[test]
    fn forbidden_prefix_warns_with_prefix_name() {
        let options = ExecutionOptions {
            forbidden_paths: vec!["metadata".to_string()],
            ..Default::default()
        };
        let report = run(
            &[Op::Add { path: p("metadata.author"), value: json!("x") }],
            &options,
        );
        let issue = report.warnings().next().unwrap();
        assert_eq!(issue.code, IssueCode::ForbiddenPathWarning);
        assert!(issue.message.contains("\"metadata\""));
    }

    #[test]
    fn findings_are_collected_not_short_circuited() {
        let report = run(
            &[
                Op::Delete { path: p("name") },
                Op::Delete { path: p("version") },
            ],
            &ExecutionOptions::default(),
        );
        assert_eq!(report.errors().count(), 2);
    }
}
