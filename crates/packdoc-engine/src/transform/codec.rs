//! Wire codec for operations.
//!
//! Converts the transport shape
//! `{action, path, value?, updates?, strategy?, equals?, exists?}`
//! to and from the [`Op`] enum. Paths on the wire are either a segment
//! array (`["entities", 0, "name"]` — strings are keys, integers are
//! indices) or a grammar string (`"entities[0].name"`).

use packdoc_path::{parse_path, Path, Segment};
use serde_json::{json, Map, Value};

use super::types::{MergeStrategy, Op, OpError};

// ── Path helpers ──────────────────────────────────────────────────────────

fn invalid(msg: impl Into<String>) -> OpError {
    OpError::Invalid(msg.into())
}

fn decode_wire_path(v: &Value) -> Result<Path, OpError> {
    match v {
        Value::String(s) => Ok(parse_path(s)?),
        Value::Array(items) => {
            let mut segments = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => segments.push(Segment::key(s.clone())),
                    Value::Number(n) => {
                        let idx = n
                            .as_u64()
                            .ok_or_else(|| invalid("path index must be a non-negative integer"))?;
                        segments.push(Segment::index(idx as usize));
                    }
                    other => {
                        return Err(invalid(format!(
                            "path segment must be a string or integer, found {other}"
                        )))
                    }
                }
            }
            Ok(Path::new(segments))
        }
        other => Err(invalid(format!(
            "path must be a string or an array of segments, found {other}"
        ))),
    }
}

fn encode_wire_path(path: &Path) -> Value {
    Value::Array(
        path.iter()
            .map(|seg| match seg {
                Segment::Key(k) => json!(k),
                Segment::Index(i) => json!(i),
            })
            .collect(),
    )
}

// ── Decoding ──────────────────────────────────────────────────────────────

/// Decode one wire operation object into an [`Op`].
pub fn decode_op(v: &Value) -> Result<Op, OpError> {
    let map = v
        .as_object()
        .ok_or_else(|| invalid("operation must be an object"))?;

    let action = map
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing \"action\""))?;

    // An absent path addresses the root (only meaningful for update/assert).
    let path = match map.get("path") {
        Some(p) => decode_wire_path(p)?,
        None => Path::root(),
    };

    match action {
        "add" => Ok(Op::Add {
            path,
            value: required_value(map, "add")?,
        }),
        "delete" => Ok(Op::Delete { path }),
        "update" => {
            let updates = map
                .get("updates")
                .and_then(Value::as_object)
                .ok_or_else(|| invalid("\"update\" requires an \"updates\" object"))?;
            Ok(Op::Update {
                path,
                updates: updates.clone(),
            })
        }
        "merge" => {
            let strategy = match map.get("strategy") {
                Some(s) => {
                    let s = s
                        .as_str()
                        .ok_or_else(|| invalid("\"strategy\" must be a string"))?;
                    MergeStrategy::from_str(s)?
                }
                None => MergeStrategy::default(),
            };
            Ok(Op::Merge {
                path,
                value: required_value(map, "merge")?,
                strategy,
            })
        }
        "add_unique" => Ok(Op::AddUnique {
            path,
            value: required_value(map, "add_unique")?,
        }),
        "assert" => {
            let equals = map.get("equals").cloned();
            let exists = match map.get("exists") {
                Some(v) => Some(
                    v.as_bool()
                        .ok_or_else(|| invalid("\"exists\" must be a boolean"))?,
                ),
                None => None,
            };
            if equals.is_none() && exists.is_none() {
                return Err(invalid(
                    "\"assert\" requires \"equals\" and/or \"exists\"",
                ));
            }
            Ok(Op::Assert {
                path,
                equals,
                exists,
            })
        }
        other => Err(invalid(format!("unknown action: \"{other}\""))),
    }
}

fn required_value(map: &Map<String, Value>, action: &str) -> Result<Value, OpError> {
    map.get("value")
        .cloned()
        .ok_or_else(|| invalid(format!("\"{action}\" requires a \"value\"")))
}

/// Decode a wire operation list. Errors carry the failing zero-based index.
pub fn decode_ops(v: &Value) -> Result<Vec<Op>, OpError> {
    let arr = v
        .as_array()
        .ok_or_else(|| invalid("operations must be an array"))?;
    arr.iter()
        .enumerate()
        .map(|(i, op)| {
            decode_op(op).map_err(|e| invalid(format!("operation [{i}]: {e}")))
        })
        .collect()
}

// ── Encoding ──────────────────────────────────────────────────────────────

/// Serialize an [`Op`] back to its wire shape.
pub fn encode_op(op: &Op) -> Value {
    match op {
        Op::Add { path, value } => json!({
            "action": "add",
            "path": encode_wire_path(path),
            "value": value
        }),
        Op::Delete { path } => json!({
            "action": "delete",
            "path": encode_wire_path(path)
        }),
        Op::Update { path, updates } => json!({
            "action": "update",
            "path": encode_wire_path(path),
            "updates": Value::Object(updates.clone())
        }),
        Op::Merge {
            path,
            value,
            strategy,
        } => json!({
            "action": "merge",
            "path": encode_wire_path(path),
            "value": value,
            "strategy": strategy.as_str()
        }),
        Op::AddUnique { path, value } => json!({
            "action": "add_unique",
            "path": encode_wire_path(path),
            "value": value
        }),
        Op::Assert {
            path,
            equals,
            exists,
        } => {
            let mut m = Map::new();
            m.insert("action".into(), json!("assert"));
            m.insert("path".into(), encode_wire_path(path));
            if let Some(eq) = equals {
                m.insert("equals".into(), eq.clone());
            }
            if let Some(ex) = exists {
                m.insert("exists".into(), json!(ex));
            }
            Value::Object(m)
        }
    }
}

/// Serialize a full operation list.
pub fn encode_ops(ops: &[Op]) -> Value {
    Value::Array(ops.iter().map(encode_op).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_segment_array_path() {
        let op = decode_op(&json!({
            "action": "add",
            "path": ["entities", 0, "name"],
            "value": "Contract"
        }))
        .unwrap();
        assert_eq!(op.path().to_string(), "entities[0].name");
    }

    #[test]
    fn decode_string_path() {
        let op = decode_op(&json!({
            "action": "delete",
            "path": "entities[1]"
        }))
        .unwrap();
        assert_eq!(
            op.path().segments(),
            &[Segment::key("entities"), Segment::index(1)]
        );
    }

    #[test]
    fn numeric_string_in_array_is_a_key() {
        let op = decode_op(&json!({
            "action": "add",
            "path": ["counts", "0"],
            "value": 1
        }))
        .unwrap();
        assert_eq!(op.path().segments()[1], Segment::key("0"));
    }

    #[test]
    fn decode_update_with_empty_path() {
        let op = decode_op(&json!({
            "action": "update",
            "path": [],
            "updates": {"version": "2.0.0"}
        }))
        .unwrap();
        assert!(op.path().is_root());
    }

    #[test]
    fn decode_rejects_unknown_action() {
        let err = decode_op(&json!({"action": "rename", "path": ["a"]})).unwrap_err();
        assert!(err.to_string().contains("unknown action"));
    }

    #[test]
    fn decode_rejects_missing_value() {
        let err = decode_op(&json!({"action": "add", "path": ["a"]})).unwrap_err();
        assert!(err.to_string().contains("requires a \"value\""));
    }

    #[test]
    fn decode_rejects_bad_strategy() {
        let err = decode_op(&json!({
            "action": "merge",
            "path": ["key_terms"],
            "value": ["x"],
            "strategy": "deep"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("unknown merge strategy"));
    }

    #[test]
    fn decode_rejects_vacuous_assert() {
        let err = decode_op(&json!({"action": "assert", "path": ["a"]})).unwrap_err();
        assert!(err.to_string().contains("assert"));
    }

    #[test]
    fn decode_rejects_negative_index() {
        let err = decode_op(&json!({
            "action": "add",
            "path": ["tags", -1],
            "value": "x"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("non-negative"));
    }

    #[test]
    fn decode_ops_reports_index() {
        let err = decode_ops(&json!([
            {"action": "add", "path": ["a"], "value": 1},
            {"action": "bogus", "path": ["b"]}
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("operation [1]"));
    }

    #[test]
    fn round_trip_every_action() {
        let ops = json!([
            {"action": "add", "path": ["key_terms"], "value": "y"},
            {"action": "delete", "path": ["entities", 0]},
            {"action": "update", "path": [], "updates": {"version": "2.0.0"}},
            {"action": "merge", "path": ["metadata"], "value": {"a": 1}, "strategy": "append"},
            {"action": "add_unique", "path": ["key_terms"], "value": "z"},
            {"action": "assert", "path": ["name"], "equals": "T", "exists": true}
        ]);
        let decoded = decode_ops(&ops).unwrap();
        let reencoded = encode_ops(&decoded);
        let redecoded = decode_ops(&reencoded).unwrap();
        assert_eq!(decoded, redecoded);
    }
}
