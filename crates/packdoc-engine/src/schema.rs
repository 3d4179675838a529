//! Built-in domain-pack schema and structural validator.
//!
//! The schema is plain data walked by the validator, so callers building
//! operation-authoring UIs can introspect it via [`Schema::describe`]. The
//! top level is closed: unknown keys are violations. Nested objects only
//! have their declared fields checked.

use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::OnceLock;
use thiserror::Error;

use packdoc_path::kind_of;

/// Legal `priority` values for entity definitions.
pub const PRIORITY_LEVELS: &[&str] = &["low", "medium", "high", "critical"];

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("version pattern"))
}

// ── Schema model ──────────────────────────────────────────────────────────

/// Structural rule for one field.
#[derive(Debug, Clone)]
pub enum FieldRule {
    /// Any string.
    Str,
    /// A strict `major.minor.patch` version string.
    VersionString,
    /// A number within an inclusive range.
    Number { min: f64, max: f64 },
    /// A string drawn from a fixed set.
    EnumStr(&'static [&'static str]),
    /// A string that must compile as a regular expression.
    RegexSource,
    /// A sequence whose items all satisfy the inner rule.
    Seq(Box<FieldRule>),
    /// An object with declared sub-fields (undeclared sub-keys pass).
    Obj(Vec<FieldSpec>),
    /// Any object.
    AnyObject,
    /// Any of the alternatives.
    OneOf(Vec<FieldRule>),
}

/// One declared field: name, rule, and whether it must be present.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub rule: FieldRule,
    pub required: bool,
}

impl FieldSpec {
    fn new(name: &str, rule: FieldRule, required: bool) -> Self {
        FieldSpec {
            name: name.to_string(),
            rule,
            required,
        }
    }
}

/// A document schema: the declared top-level fields. The top level is
/// always a closed map.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

/// A single structural violation: dotted path plus a human message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

/// The first (most specific) violation, as an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("SCHEMA_VIOLATION at \"{path}\": {message}")]
pub struct SchemaError {
    pub path: String,
    pub message: String,
}

impl From<SchemaViolation> for SchemaError {
    fn from(v: SchemaViolation) -> Self {
        SchemaError {
            path: v.path,
            message: v.message,
        }
    }
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Schema { fields }
    }

    /// The built-in domain-pack schema.
    pub fn domain_pack() -> Self {
        use FieldRule::*;
        Schema::new(vec![
            FieldSpec::new("name", Str, true),
            FieldSpec::new("description", Str, true),
            FieldSpec::new("version", VersionString, true),
            FieldSpec::new(
                "entities",
                Seq(Box::new(Obj(vec![
                    FieldSpec::new("name", Str, true),
                    FieldSpec::new("type", Str, false),
                    FieldSpec::new("description", Str, false),
                    FieldSpec::new("priority", EnumStr(PRIORITY_LEVELS), false),
                    FieldSpec::new("attributes", AnyObject, false),
                ]))),
                false,
            ),
            FieldSpec::new(
                "relationships",
                Seq(Box::new(Obj(vec![
                    FieldSpec::new("source", Str, true),
                    FieldSpec::new("target", Str, true),
                    FieldSpec::new("type", Str, true),
                    FieldSpec::new("description", Str, false),
                ]))),
                false,
            ),
            FieldSpec::new(
                "extraction_patterns",
                Seq(Box::new(Obj(vec![
                    FieldSpec::new("pattern", RegexSource, true),
                    FieldSpec::new("field", Str, false),
                    FieldSpec::new("confidence", Number { min: 0.0, max: 1.0 }, false),
                ]))),
                false,
            ),
            // `add` on an absent key stores the raw value, so both a bare
            // string and a list of strings are legal shapes here.
            FieldSpec::new("key_terms", OneOf(vec![Str, Seq(Box::new(Str))]), false),
            FieldSpec::new("metadata", AnyObject, false),
        ])
    }

    /// Names of required top-level fields.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
    }

    /// The declared spec for a top-level field, if any.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate, returning the first violation as an error.
    pub fn validate(&self, doc: &Value) -> Result<(), SchemaError> {
        match self.check(doc).into_iter().next() {
            Some(v) => Err(v.into()),
            None => Ok(()),
        }
    }

    /// Non-throwing variant: collect every violation for diagnostics.
    pub fn check(&self, doc: &Value) -> Vec<SchemaViolation> {
        let mut out = Vec::new();
        let map = match doc {
            Value::Object(map) => map,
            other => {
                out.push(SchemaViolation {
                    path: String::new(),
                    message: format!("document must be a map, found {}", kind_of(other)),
                });
                return out;
            }
        };

        for field in &self.fields {
            match map.get(&field.name) {
                Some(value) => check_rule(&field.rule, value, &field.name, &mut out),
                None if field.required => out.push(SchemaViolation {
                    path: field.name.clone(),
                    message: format!("required field \"{}\" is missing", field.name),
                }),
                None => {}
            }
        }

        // Closed top level.
        for key in map.keys() {
            if self.field(key).is_none() {
                out.push(SchemaViolation {
                    path: key.clone(),
                    message: format!("unknown top-level field \"{key}\""),
                });
            }
        }

        out
    }

    /// JSON description of the schema for caller introspection.
    pub fn describe(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            properties.insert(field.name.clone(), describe_rule(&field.rule));
            if field.required {
                required.push(json!(field.name));
            }
        }
        json!({
            "type": "object",
            "additionalProperties": false,
            "required": required,
            "properties": properties
        })
    }
}

// ── Rule checking ─────────────────────────────────────────────────────────

fn violation(out: &mut Vec<SchemaViolation>, path: &str, message: String) {
    out.push(SchemaViolation {
        path: path.to_string(),
        message,
    });
}

fn check_rule(rule: &FieldRule, value: &Value, path: &str, out: &mut Vec<SchemaViolation>) {
    match rule {
        FieldRule::Str => {
            if !value.is_string() {
                violation(out, path, format!("expected string, found {}", kind_of(value)));
            }
        }
        FieldRule::VersionString => match value.as_str() {
            Some(s) if version_re().is_match(s) => {}
            Some(s) => violation(
                out,
                path,
                format!("\"{s}\" does not match the major.minor.patch pattern"),
            ),
            None => violation(
                out,
                path,
                format!("expected version string, found {}", kind_of(value)),
            ),
        },
        FieldRule::Number { min, max } => match value.as_f64() {
            Some(n) if n >= *min && n <= *max => {}
            Some(n) => violation(out, path, format!("{n} is outside [{min}, {max}]")),
            None => violation(
                out,
                path,
                format!("expected number, found {}", kind_of(value)),
            ),
        },
        FieldRule::EnumStr(allowed) => match value.as_str() {
            Some(s) if allowed.contains(&s) => {}
            Some(s) => violation(
                out,
                path,
                format!("\"{s}\" is not one of {}", allowed.join(", ")),
            ),
            None => violation(
                out,
                path,
                format!("expected string, found {}", kind_of(value)),
            ),
        },
        FieldRule::RegexSource => match value.as_str() {
            Some(s) => {
                if let Err(e) = Regex::new(s) {
                    violation(out, path, format!("invalid pattern: {e}"));
                }
            }
            None => violation(
                out,
                path,
                format!("expected pattern string, found {}", kind_of(value)),
            ),
        },
        FieldRule::Seq(inner) => match value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    check_rule(inner, item, &format!("{path}[{i}]"), out);
                }
            }
            other => violation(
                out,
                path,
                format!("expected sequence, found {}", kind_of(other)),
            ),
        },
        FieldRule::Obj(fields) => match value {
            Value::Object(map) => {
                for field in fields {
                    let sub_path = format!("{path}.{}", field.name);
                    match map.get(&field.name) {
                        Some(sub) => check_rule(&field.rule, sub, &sub_path, out),
                        None if field.required => violation(
                            out,
                            &sub_path,
                            format!("required field \"{}\" is missing", field.name),
                        ),
                        None => {}
                    }
                }
            }
            other => violation(out, path, format!("expected map, found {}", kind_of(other))),
        },
        FieldRule::AnyObject => {
            if !value.is_object() {
                violation(out, path, format!("expected map, found {}", kind_of(value)));
            }
        }
        FieldRule::OneOf(alternatives) => {
            let matched = alternatives.iter().any(|alt| {
                let mut probe = Vec::new();
                check_rule(alt, value, path, &mut probe);
                probe.is_empty()
            });
            if !matched {
                violation(
                    out,
                    path,
                    format!("{} does not match any allowed shape", kind_of(value)),
                );
            }
        }
    }
}

/// Shallow kind compatibility, used by the safety pass to flag payloads
/// whose runtime kind disagrees with the declared one.
pub fn rule_accepts_kind(rule: &FieldRule, value: &Value) -> bool {
    match rule {
        FieldRule::Str | FieldRule::VersionString | FieldRule::RegexSource => value.is_string(),
        FieldRule::EnumStr(_) => value.is_string(),
        FieldRule::Number { .. } => value.is_number(),
        FieldRule::Seq(_) => value.is_array(),
        FieldRule::Obj(_) | FieldRule::AnyObject => value.is_object(),
        FieldRule::OneOf(alts) => alts.iter().any(|alt| rule_accepts_kind(alt, value)),
    }
}

fn describe_rule(rule: &FieldRule) -> Value {
    match rule {
        FieldRule::Str => json!({"type": "string"}),
        FieldRule::VersionString => json!({
            "type": "string",
            "pattern": r"^\d+\.\d+\.\d+$"
        }),
        FieldRule::Number { min, max } => json!({
            "type": "number",
            "minimum": min,
            "maximum": max
        }),
        FieldRule::EnumStr(allowed) => json!({
            "type": "string",
            "enum": allowed
        }),
        FieldRule::RegexSource => json!({
            "type": "string",
            "format": "regex"
        }),
        FieldRule::Seq(inner) => json!({
            "type": "array",
            "items": describe_rule(inner)
        }),
        FieldRule::Obj(fields) => {
            let mut properties = Map::new();
            let mut required = Vec::new();
            for field in fields {
                properties.insert(field.name.clone(), describe_rule(&field.rule));
                if field.required {
                    required.push(json!(field.name));
                }
            }
            json!({
                "type": "object",
                "required": required,
                "properties": properties
            })
        }
        FieldRule::AnyObject => json!({"type": "object"}),
        FieldRule::OneOf(alternatives) => json!({
            "oneOf": alternatives.iter().map(describe_rule).collect::<Vec<_>>()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> Value {
        json!({"name": "T", "description": "T", "version": "1.0.0"})
    }

    #[test]
    fn minimal_document_is_valid() {
        Schema::domain_pack().validate(&minimal()).unwrap();
    }

    #[test]
    fn missing_required_field() {
        let err = Schema::domain_pack()
            .validate(&json!({"name": "T", "version": "1.0.0"}))
            .unwrap_err();
        assert_eq!(err.path, "description");
    }

    #[test]
    fn bad_version_pattern() {
        let mut doc = minimal();
        doc["version"] = json!("1.0");
        let err = Schema::domain_pack().validate(&doc).unwrap_err();
        assert_eq!(err.path, "version");
        assert!(err.message.contains("major.minor.patch"));
    }

    #[test]
    fn unknown_top_level_key_rejected() {
        let mut doc = minimal();
        doc["surprise"] = json!(1);
        let err = Schema::domain_pack().validate(&doc).unwrap_err();
        assert_eq!(err.path, "surprise");
    }

    #[test]
    fn entity_priority_enum() {
        let mut doc = minimal();
        doc["entities"] = json!([{"name": "A", "priority": "urgent"}]);
        let err = Schema::domain_pack().validate(&doc).unwrap_err();
        assert_eq!(err.path, "entities[0].priority");
    }

    #[test]
    fn entity_missing_name() {
        let mut doc = minimal();
        doc["entities"] = json!([{"priority": "low"}]);
        let err = Schema::domain_pack().validate(&doc).unwrap_err();
        assert_eq!(err.path, "entities[0].name");
    }

    #[test]
    fn confidence_range() {
        let mut doc = minimal();
        doc["extraction_patterns"] = json!([{"pattern": "a+", "confidence": 1.5}]);
        let err = Schema::domain_pack().validate(&doc).unwrap_err();
        assert_eq!(err.path, "extraction_patterns[0].confidence");
    }

    #[test]
    fn invalid_extraction_pattern_source() {
        let mut doc = minimal();
        doc["extraction_patterns"] = json!([{"pattern": "("}]);
        let err = Schema::domain_pack().validate(&doc).unwrap_err();
        assert_eq!(err.path, "extraction_patterns[0].pattern");
    }

    #[test]
    fn key_terms_accepts_both_shapes() {
        let schema = Schema::domain_pack();
        let mut doc = minimal();
        doc["key_terms"] = json!("legal");
        schema.validate(&doc).unwrap();
        doc["key_terms"] = json!(["legal", "contract"]);
        schema.validate(&doc).unwrap();
        doc["key_terms"] = json!(42);
        assert!(schema.validate(&doc).is_err());
    }

    #[test]
    fn check_collects_all_violations() {
        let doc = json!({"name": 1, "version": "x"});
        let violations = Schema::domain_pack().check(&doc);
        // name kind, missing description, bad version
        assert_eq!(violations.len(), 3);
    }

    #[test]
    fn relationships_require_endpoints() {
        let mut doc = minimal();
        doc["relationships"] = json!([{"source": "A", "type": "uses"}]);
        let err = Schema::domain_pack().validate(&doc).unwrap_err();
        assert_eq!(err.path, "relationships[0].target");
    }

    #[test]
    fn describe_lists_required_fields() {
        let desc = Schema::domain_pack().describe();
        assert_eq!(desc["required"], json!(["name", "description", "version"]));
        assert_eq!(desc["additionalProperties"], json!(false));
        assert_eq!(
            desc["properties"]["entities"]["items"]["properties"]["priority"]["enum"],
            json!(PRIORITY_LEVELS)
        );
    }
}
