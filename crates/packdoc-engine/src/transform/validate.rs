//! Raw-shape validation of untrusted operation JSON.
//!
//! Works on the wire representation before decoding, so callers can reject
//! malformed input early with the index of the offending operation. The
//! codec performs its own (stricter) checks during decoding; this pass
//! exists to turn "fundamentally wrong argument" cases into structured
//! errors instead of deep decode failures.

use serde_json::Value;

// ── Error ──────────────────────────────────────────────────────────────────

/// Error returned by validation functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ValidationError {}

fn err(msg: impl Into<String>) -> ValidationError {
    ValidationError(msg.into())
}

const KNOWN_ACTIONS: &[&str] = &["add", "delete", "update", "merge", "add_unique", "assert"];

// ── Public API ─────────────────────────────────────────────────────────────

/// Validate a list of wire operations.
///
/// Errors include the index of the failing operation:
/// `"Error in operation [index = N] (reason)."`.
pub fn validate_operations(ops: &Value) -> Result<(), ValidationError> {
    let arr = ops
        .as_array()
        .ok_or_else(|| err("Operations must be an array."))?;
    for (i, op) in arr.iter().enumerate() {
        validate_operation(op).map_err(|e| {
            ValidationError(format!("Error in operation [index = {}] ({}).", i, e.0))
        })?;
    }
    Ok(())
}

/// Validate a single wire operation object.
pub fn validate_operation(op: &Value) -> Result<(), ValidationError> {
    let map = op.as_object().ok_or_else(|| err("OP_INVALID"))?;

    let action = map
        .get("action")
        .ok_or_else(|| err("OP_ACTION_MISSING"))?
        .as_str()
        .ok_or_else(|| err("OP_ACTION_INVALID"))?;
    if !KNOWN_ACTIONS.contains(&action) {
        return Err(err(format!("OP_UNKNOWN: \"{action}\"")));
    }

    if let Some(path) = map.get("path") {
        validate_wire_path(path)?;
    }

    match action {
        "add" | "add_unique" => {
            if !map.contains_key("value") {
                return Err(err("OP_VALUE_MISSING"));
            }
            Ok(())
        }
        "delete" => Ok(()),
        "update" => {
            let updates = map.get("updates").ok_or_else(|| err("OP_UPDATES_MISSING"))?;
            if !updates.is_object() {
                return Err(err("OP_UPDATES_INVALID: \"updates\" must be an object"));
            }
            Ok(())
        }
        "merge" => {
            if !map.contains_key("value") {
                return Err(err("OP_VALUE_MISSING"));
            }
            if let Some(strategy) = map.get("strategy") {
                match strategy.as_str() {
                    Some("append") => {}
                    _ => return Err(err("OP_STRATEGY_INVALID: only \"append\" is supported")),
                }
            }
            Ok(())
        }
        "assert" => {
            let has_equals = map.contains_key("equals");
            let has_exists = match map.get("exists") {
                Some(v) => {
                    if !v.is_boolean() {
                        return Err(err("OP_EXISTS_INVALID: \"exists\" must be a boolean"));
                    }
                    true
                }
                None => false,
            };
            if !has_equals && !has_exists {
                return Err(err("OP_ASSERT_EMPTY: requires \"equals\" and/or \"exists\""));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn validate_wire_path(path: &Value) -> Result<(), ValidationError> {
    match path {
        Value::String(_) => Ok(()),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(_) => {}
                    Value::Number(n) if n.as_u64().is_some() => {}
                    _ => {
                        return Err(err(
                            "OP_PATH_INVALID: segments must be strings or non-negative integers",
                        ))
                    }
                }
            }
            Ok(())
        }
        _ => Err(err("OP_PATH_INVALID: must be a string or segment array")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_well_formed_batch() {
        let ops = json!([
            {"action": "add", "path": ["key_terms"], "value": "y"},
            {"action": "delete", "path": "entities[0]"},
            {"action": "assert", "path": ["name"], "exists": true}
        ]);
        validate_operations(&ops).unwrap();
    }

    #[test]
    fn accepts_empty_batch() {
        validate_operations(&json!([])).unwrap();
    }

    #[test]
    fn rejects_non_array() {
        let e = validate_operations(&json!({"action": "add"})).unwrap_err();
        assert!(e.0.contains("must be an array"));
    }

    #[test]
    fn rejects_non_object_op_with_index() {
        let e = validate_operations(&json!([{"action": "delete", "path": ["a"]}, 42]))
            .unwrap_err();
        assert!(e.0.contains("[index = 1]"));
        assert!(e.0.contains("OP_INVALID"));
    }

    #[test]
    fn rejects_unknown_action() {
        let e = validate_operation(&json!({"action": "rename", "path": ["a"]})).unwrap_err();
        assert!(e.0.contains("OP_UNKNOWN"));
    }

    #[test]
    fn rejects_missing_value() {
        let e = validate_operation(&json!({"action": "add", "path": ["a"]})).unwrap_err();
        assert_eq!(e.0, "OP_VALUE_MISSING");
    }

    #[test]
    fn rejects_bad_updates() {
        let e = validate_operation(&json!({
            "action": "update", "path": [], "updates": ["not", "a", "map"]
        }))
        .unwrap_err();
        assert!(e.0.contains("OP_UPDATES_INVALID"));
    }

    #[test]
    fn rejects_float_path_segment() {
        let e = validate_operation(&json!({
            "action": "delete", "path": ["tags", 1.5]
        }))
        .unwrap_err();
        assert!(e.0.contains("OP_PATH_INVALID"));
    }

    #[test]
    fn rejects_bad_exists_flag() {
        let e = validate_operation(&json!({
            "action": "assert", "path": ["a"], "exists": "yes"
        }))
        .unwrap_err();
        assert!(e.0.contains("OP_EXISTS_INVALID"));
    }
}
