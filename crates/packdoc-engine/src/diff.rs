//! Structural diff between two document snapshots.
//!
//! Four buckets: added, removed, changed (scalar old/new pairs), and type
//! changes (same path, incompatible kind). Sequences are compared by
//! position — an item that merely moved is reported as removed+added, a
//! deliberate determinism trade-off.

use packdoc_path::{kind_of, Path, Segment};
use serde_json::{json, Value};

/// A key or item that appeared or disappeared.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    pub path: String,
    pub value: Value,
}

/// A scalar value change at one path.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChange {
    pub path: String,
    pub old: Value,
    pub new: Value,
}

/// A container-kind change at one path.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeChange {
    pub path: String,
    pub old_kind: &'static str,
    pub new_kind: &'static str,
    pub old: Value,
    pub new: Value,
}

/// The structural delta between two documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentDiff {
    pub added: Vec<DiffEntry>,
    pub removed: Vec<DiffEntry>,
    pub changed: Vec<ValueChange>,
    pub type_changed: Vec<TypeChange>,
}

impl DocumentDiff {
    pub fn total_changes(&self) -> usize {
        self.added.len() + self.removed.len() + self.changed.len() + self.type_changed.len()
    }

    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }

    /// JSON rendering with the change summary, for transport.
    pub fn to_value(&self) -> Value {
        json!({
            "added": self.added.iter().map(|e| json!({"path": e.path, "value": e.value})).collect::<Vec<_>>(),
            "removed": self.removed.iter().map(|e| json!({"path": e.path, "value": e.value})).collect::<Vec<_>>(),
            "changed": self.changed.iter().map(|c| json!({"path": c.path, "old": c.old, "new": c.new})).collect::<Vec<_>>(),
            "type_changed": self.type_changed.iter().map(|t| json!({
                "path": t.path,
                "old_type": t.old_kind,
                "new_type": t.new_kind,
                "old": t.old,
                "new": t.new
            })).collect::<Vec<_>>(),
            "summary": {
                "total_changes": self.total_changes(),
                "has_changes": self.has_changes()
            }
        })
    }
}

/// Compute the structural diff between `old` and `new`.
pub fn diff(old: &Value, new: &Value) -> DocumentDiff {
    let mut out = DocumentDiff::default();
    walk(old, new, &Path::root(), &mut out);
    out
}

fn walk(old: &Value, new: &Value, path: &Path, out: &mut DocumentDiff) {
    if old == new {
        return;
    }
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            for (key, old_val) in old_map {
                let child = path.child(Segment::key(key.clone()));
                match new_map.get(key) {
                    Some(new_val) => walk(old_val, new_val, &child, out),
                    None => out.removed.push(DiffEntry {
                        path: child.to_string(),
                        value: old_val.clone(),
                    }),
                }
            }
            for (key, new_val) in new_map {
                if !old_map.contains_key(key) {
                    out.added.push(DiffEntry {
                        path: path.child(Segment::key(key.clone())).to_string(),
                        value: new_val.clone(),
                    });
                }
            }
        }
        (Value::Array(old_arr), Value::Array(new_arr)) => {
            let common = old_arr.len().min(new_arr.len());
            for i in 0..common {
                walk(&old_arr[i], &new_arr[i], &path.child(Segment::index(i)), out);
            }
            for (i, item) in old_arr.iter().enumerate().skip(common) {
                out.removed.push(DiffEntry {
                    path: path.child(Segment::index(i)).to_string(),
                    value: item.clone(),
                });
            }
            for (i, item) in new_arr.iter().enumerate().skip(common) {
                out.added.push(DiffEntry {
                    path: path.child(Segment::index(i)).to_string(),
                    value: item.clone(),
                });
            }
        }
        (old, new) if kind_of(old) != kind_of(new) => {
            out.type_changed.push(TypeChange {
                path: path.to_string(),
                old_kind: kind_of(old),
                new_kind: kind_of(new),
                old: old.clone(),
                new: new.clone(),
            });
        }
        (old, new) => {
            out.changed.push(ValueChange {
                path: path.to_string(),
                old: old.clone(),
                new: new.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_documents_have_no_changes() {
        let d = json!({"a": 1, "b": [1, 2]});
        let result = diff(&d, &d.clone());
        assert!(!result.has_changes());
        assert_eq!(result.total_changes(), 0);
    }

    #[test]
    fn added_and_removed_keys() {
        let old = json!({"a": 1, "b": 2});
        let new = json!({"a": 1, "c": 3});
        let result = diff(&old, &new);
        assert_eq!(
            result.removed,
            vec![DiffEntry { path: "b".into(), value: json!(2) }]
        );
        assert_eq!(
            result.added,
            vec![DiffEntry { path: "c".into(), value: json!(3) }]
        );
    }

    #[test]
    fn scalar_change_carries_old_and_new() {
        let old = json!({"version": "1.0.0"});
        let new = json!({"version": "2.0.0"});
        let result = diff(&old, &new);
        assert_eq!(
            result.changed,
            vec![ValueChange {
                path: "version".into(),
                old: json!("1.0.0"),
                new: json!("2.0.0")
            }]
        );
    }

    #[test]
    fn kind_change_is_its_own_bucket() {
        let old = json!({"key_terms": "legal"});
        let new = json!({"key_terms": ["legal"]});
        let result = diff(&old, &new);
        assert_eq!(result.type_changed.len(), 1);
        assert_eq!(result.type_changed[0].old_kind, "string");
        assert_eq!(result.type_changed[0].new_kind, "sequence");
        assert!(result.changed.is_empty());
    }

    #[test]
    fn nested_paths_are_dotted() {
        let old = json!({"entities": [{"name": "A", "priority": "low"}]});
        let new = json!({"entities": [{"name": "A", "priority": "high"}]});
        let result = diff(&old, &new);
        assert_eq!(result.changed[0].path, "entities[0].priority");
    }

    #[test]
    fn sequence_growth_is_added() {
        let old = json!({"key_terms": ["x"]});
        let new = json!({"key_terms": ["x", "y"]});
        let result = diff(&old, &new);
        assert_eq!(
            result.added,
            vec![DiffEntry { path: "key_terms[1]".into(), value: json!("y") }]
        );
    }

    #[test]
    fn moved_item_reports_as_positional_changes() {
        // Order-sensitive by design: a rotation shows up as element-wise
        // changes, not as a move.
        let old = json!(["a", "b"]);
        let new = json!(["b", "a"]);
        let result = diff(&old, &new);
        assert_eq!(result.changed.len(), 2);
    }

    #[test]
    fn to_value_summary() {
        let old = json!({"a": 1});
        let new = json!({"a": 2, "b": 3});
        let v = diff(&old, &new).to_value();
        assert_eq!(v["summary"]["total_changes"], json!(2));
        assert_eq!(v["summary"]["has_changes"], json!(true));
    }

    #[test]
    fn number_bool_null_transitions() {
        let old = json!({"x": 1, "y": true, "z": null});
        let new = json!({"x": 2, "y": false, "z": null});
        let result = diff(&old, &new);
        assert_eq!(result.changed.len(), 2);
        assert!(result.type_changed.is_empty());
    }
}
