//! Applicators for the primitive operations.
//!
//! Each function mutates the document it is handed; callers that need
//! atomicity keep the original and hand in a copy (the executor does this
//! once per pipeline run, not per operation).

use packdoc_path::{get, kind_of, resolve_parent_mut, Path, PathError, Segment};
use serde_json::{Map, Value};

use super::types::{BatchError, MergeStrategy, Op, OpError};

/// Navigate mutably to the value at `path`. The root path yields the
/// document itself.
fn target_mut<'a>(doc: &'a mut Value, path: &Path) -> Result<&'a mut Value, OpError> {
    if path.is_root() {
        return Ok(doc);
    }
    let (parent, seg) = resolve_parent_mut(doc, path, false)?;
    match (parent, &seg) {
        (Value::Object(map), Segment::Key(k)) => map
            .get_mut(k)
            .ok_or_else(|| OpError::Path(PathError::NotFound(path.to_string()))),
        (Value::Array(arr), Segment::Index(i)) => {
            let len = arr.len();
            arr.get_mut(*i).ok_or(OpError::Path(PathError::IndexOutOfBounds {
                path: parent_path_string(path),
                index: *i,
                len,
            }))
        }
        (other, Segment::Key(_)) => Err(OpError::Path(PathError::TypeMismatch {
            path: parent_path_string(path),
            expected: "map",
            found: kind_of(other),
        })),
        (other, Segment::Index(_)) => Err(OpError::Path(PathError::TypeMismatch {
            path: parent_path_string(path),
            expected: "sequence",
            found: kind_of(other),
        })),
    }
}

fn parent_path_string(path: &Path) -> String {
    path.parent().unwrap_or_default().to_string()
}

// ── add ───────────────────────────────────────────────────────────────────

/// `add` has a dual rule: an absent map key is set to the raw value, while
/// a key that already holds a sequence gets the value appended. Any other
/// occupied location is an error.
fn apply_add(
    doc: &mut Value,
    path: &Path,
    value: Value,
    auto_create: bool,
) -> Result<(), OpError> {
    let (parent, seg) = resolve_parent_mut(doc, path, auto_create)?;
    match (parent, seg) {
        (Value::Object(map), Segment::Key(k)) => {
            if !map.contains_key(&k) {
                map.insert(k, value);
                return Ok(());
            }
            match map.get_mut(&k) {
                Some(Value::Array(arr)) => {
                    arr.push(value);
                    Ok(())
                }
                Some(other) => Err(OpError::KeyAlreadyExists {
                    path: path.to_string(),
                    found: kind_of(other),
                }),
                None => Err(OpError::Path(PathError::NotFound(path.to_string()))),
            }
        }
        (Value::Array(arr), Segment::Index(i)) => {
            // Insertion point: index == len appends.
            if i > arr.len() {
                return Err(OpError::Path(PathError::IndexOutOfBounds {
                    path: parent_path_string(path),
                    index: i,
                    len: arr.len(),
                }));
            }
            arr.insert(i, value);
            Ok(())
        }
        (other, Segment::Key(_)) => Err(OpError::Path(PathError::TypeMismatch {
            path: parent_path_string(path),
            expected: "map",
            found: kind_of(other),
        })),
        (other, Segment::Index(_)) => Err(OpError::Path(PathError::TypeMismatch {
            path: parent_path_string(path),
            expected: "sequence",
            found: kind_of(other),
        })),
    }
}

// ── delete ────────────────────────────────────────────────────────────────

fn apply_delete(doc: &mut Value, path: &Path) -> Result<(), OpError> {
    let (parent, seg) = resolve_parent_mut(doc, path, false)?;
    match (parent, seg) {
        (Value::Object(map), Segment::Key(k)) => {
            map.shift_remove(&k)
                .ok_or_else(|| OpError::Path(PathError::NotFound(path.to_string())))?;
            Ok(())
        }
        (Value::Array(arr), Segment::Index(i)) => {
            if i >= arr.len() {
                return Err(OpError::Path(PathError::IndexOutOfBounds {
                    path: parent_path_string(path),
                    index: i,
                    len: arr.len(),
                }));
            }
            arr.remove(i);
            Ok(())
        }
        (other, Segment::Key(_)) => Err(OpError::Path(PathError::TypeMismatch {
            path: parent_path_string(path),
            expected: "map",
            found: kind_of(other),
        })),
        (other, Segment::Index(_)) => Err(OpError::Path(PathError::TypeMismatch {
            path: parent_path_string(path),
            expected: "sequence",
            found: kind_of(other),
        })),
    }
}

// ── update ────────────────────────────────────────────────────────────────

fn apply_update(
    doc: &mut Value,
    path: &Path,
    updates: &Map<String, Value>,
) -> Result<(), OpError> {
    let target = target_mut(doc, path)?;
    match target {
        Value::Object(map) => {
            for (k, v) in updates {
                map.insert(k.clone(), v.clone());
            }
            Ok(())
        }
        other => Err(OpError::NotAnObject {
            path: path.to_string(),
            found: kind_of(other),
        }),
    }
}

// ── merge ─────────────────────────────────────────────────────────────────

fn apply_merge(
    doc: &mut Value,
    path: &Path,
    value: &Value,
    _strategy: MergeStrategy,
) -> Result<(), OpError> {
    let target = target_mut(doc, path)?;
    match (target, value) {
        (Value::Object(map), Value::Object(payload)) => {
            // Shallow merge, payload wins on collision.
            for (k, v) in payload {
                map.insert(k.clone(), v.clone());
            }
            Ok(())
        }
        (Value::Array(arr), Value::Array(payload)) => {
            arr.extend(payload.iter().cloned());
            Ok(())
        }
        (target, payload) => Err(OpError::MergeKindMismatch {
            path: path.to_string(),
            target: kind_of(target),
            payload: kind_of(payload),
        }),
    }
}

// ── add_unique ────────────────────────────────────────────────────────────

fn apply_add_unique(
    doc: &mut Value,
    path: &Path,
    value: Value,
    auto_create: bool,
) -> Result<(), OpError> {
    let (parent, seg) = resolve_parent_mut(doc, path, auto_create)?;
    match (parent, seg) {
        (Value::Object(map), Segment::Key(k)) => {
            // Absent key: plain add semantics.
            if !map.contains_key(&k) {
                map.insert(k, value);
                return Ok(());
            }
            match map.get_mut(&k) {
                Some(Value::Array(arr)) => {
                    if !arr.contains(&value) {
                        arr.push(value);
                    }
                    Ok(())
                }
                // Present and not a sequence: already set, nothing to do.
                _ => Ok(()),
            }
        }
        (Value::Array(arr), Segment::Index(i)) => {
            if i > arr.len() {
                return Err(OpError::Path(PathError::IndexOutOfBounds {
                    path: parent_path_string(path),
                    index: i,
                    len: arr.len(),
                }));
            }
            if !arr.contains(&value) {
                arr.insert(i, value);
            }
            Ok(())
        }
        (other, Segment::Key(_)) => Err(OpError::Path(PathError::TypeMismatch {
            path: parent_path_string(path),
            expected: "map",
            found: kind_of(other),
        })),
        (other, Segment::Index(_)) => Err(OpError::Path(PathError::TypeMismatch {
            path: parent_path_string(path),
            expected: "sequence",
            found: kind_of(other),
        })),
    }
}

// ── assert ────────────────────────────────────────────────────────────────

fn apply_assert(
    doc: &Value,
    path: &Path,
    equals: Option<&Value>,
    exists: Option<bool>,
) -> Result<(), OpError> {
    let actual = get(doc, path);

    if let Some(expect_exists) = exists {
        if actual.is_some() != expect_exists {
            return Err(OpError::AssertionFailed {
                path: path.to_string(),
                message: if expect_exists {
                    "expected path to exist".to_string()
                } else {
                    "expected path to be absent".to_string()
                },
                expected: None,
                actual: actual.cloned(),
            });
        }
    }

    if let Some(expected) = equals {
        match actual {
            Some(actual) if actual == expected => {}
            _ => {
                return Err(OpError::AssertionFailed {
                    path: path.to_string(),
                    message: format!(
                        "expected {expected}, actual {}",
                        actual.map_or_else(|| "<absent>".to_string(), |v| v.to_string())
                    ),
                    expected: Some(expected.clone()),
                    actual: actual.cloned(),
                });
            }
        }
    }

    Ok(())
}

// ── Dispatch ──────────────────────────────────────────────────────────────

/// Apply one operation to the document in place.
pub fn apply_op(doc: &mut Value, op: &Op, auto_create: bool) -> Result<(), OpError> {
    match op {
        Op::Add { path, value } => apply_add(doc, path, value.clone(), auto_create),
        Op::Delete { path } => apply_delete(doc, path),
        Op::Update { path, updates } => apply_update(doc, path, updates),
        Op::Merge {
            path,
            value,
            strategy,
        } => apply_merge(doc, path, value, *strategy),
        Op::AddUnique { path, value } => {
            apply_add_unique(doc, path, value.clone(), auto_create)
        }
        Op::Assert {
            path,
            equals,
            exists,
        } => apply_assert(doc, path, equals.as_ref(), *exists),
    }
}

/// Thread the document through `ops` in order.
///
/// Short-circuits on the first failure, reporting the zero-based index of
/// the failing operation. The returned document on the error side is
/// dropped — the caller keeps its own pristine copy.
pub fn apply_batch(mut doc: Value, ops: &[Op], auto_create: bool) -> Result<Value, BatchError> {
    for (index, op) in ops.iter().enumerate() {
        apply_op(&mut doc, op, auto_create).map_err(|source| BatchError { index, source })?;
    }
    Ok(doc)
}
