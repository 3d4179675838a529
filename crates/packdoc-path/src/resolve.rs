//! Path resolution against a document tree.
//!
//! Read-side resolution produces a [`NodeRef`] describing the terminal
//! location; write-side resolution navigates to the *parent* container
//! mutably so the caller mutates the real tree, not a detached value.

use serde_json::{Map, Value};

use crate::types::{NodeRef, Path, Segment};
use crate::{kind_of, PathError};

fn prefix_string(path: &Path, upto: usize) -> String {
    Path::new(path.segments()[..upto].to_vec()).to_string()
}

/// Get a reference to the value at `path`, if it exists.
pub fn get<'a>(doc: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = doc;
    for seg in path.iter() {
        current = match (current, seg) {
            (Value::Object(map), Segment::Key(k)) => map.get(k)?,
            (Value::Array(arr), Segment::Index(i)) => arr.get(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Resolve `path` against `doc`, producing a [`NodeRef`].
///
/// Intermediate segments must exist and have the container kind the segment
/// demands. For the terminal segment, a missing map key yields
/// `exists = false` when `allow_missing` is set (the write-side counterpart
/// of `auto_create`) and [`PathError::NotFound`] otherwise; an out-of-range
/// index always fails with [`PathError::IndexOutOfBounds`].
pub fn resolve<'a>(
    doc: &'a Value,
    path: &Path,
    allow_missing: bool,
) -> Result<NodeRef<'a>, PathError> {
    if path.is_root() {
        return Ok(NodeRef {
            parent: None,
            segment: None,
            value: Some(doc),
            exists: true,
        });
    }

    let mut parent = doc;
    let last = path.len() - 1;
    for (i, seg) in path.iter().enumerate().take(last) {
        parent = match (parent, seg) {
            (Value::Object(map), Segment::Key(k)) => map
                .get(k)
                .ok_or_else(|| PathError::NotFound(prefix_string(path, i + 1)))?,
            (Value::Array(arr), Segment::Index(idx)) => {
                let len = arr.len();
                arr.get(*idx).ok_or(PathError::IndexOutOfBounds {
                    path: prefix_string(path, i),
                    index: *idx,
                    len,
                })?
            }
            (other, Segment::Key(_)) => {
                return Err(PathError::TypeMismatch {
                    path: prefix_string(path, i),
                    expected: "map",
                    found: kind_of(other),
                })
            }
            (other, Segment::Index(_)) => {
                return Err(PathError::TypeMismatch {
                    path: prefix_string(path, i),
                    expected: "sequence",
                    found: kind_of(other),
                })
            }
        };
    }

    let seg = &path.segments()[last];
    match (parent, seg) {
        (Value::Object(map), Segment::Key(k)) => match map.get(k) {
            Some(value) => Ok(NodeRef {
                parent: Some(parent),
                segment: Some(seg.clone()),
                value: Some(value),
                exists: true,
            }),
            None if allow_missing => Ok(NodeRef {
                parent: Some(parent),
                segment: Some(seg.clone()),
                value: None,
                exists: false,
            }),
            None => Err(PathError::NotFound(path.to_string())),
        },
        (Value::Array(arr), Segment::Index(idx)) => {
            let len = arr.len();
            match arr.get(*idx) {
                Some(value) => Ok(NodeRef {
                    parent: Some(parent),
                    segment: Some(seg.clone()),
                    value: Some(value),
                    exists: true,
                }),
                None => Err(PathError::IndexOutOfBounds {
                    path: prefix_string(path, last),
                    index: *idx,
                    len,
                }),
            }
        }
        (other, Segment::Key(_)) => Err(PathError::TypeMismatch {
            path: prefix_string(path, last),
            expected: "map",
            found: kind_of(other),
        }),
        (other, Segment::Index(_)) => Err(PathError::TypeMismatch {
            path: prefix_string(path, last),
            expected: "sequence",
            found: kind_of(other),
        }),
    }
}

/// Navigate mutably to the parent container of the terminal segment.
///
/// Returns the parent container and the terminal segment. With
/// `auto_create`, a missing *intermediate* map key is created as a fresh
/// map or sequence depending on the kind of the following segment; the
/// terminal location itself is never created here — that is the operation's
/// decision.
///
/// # Errors
///
/// [`PathError::RootWrite`] for the root path — no operation may replace or
/// delete the document root through a path.
pub fn resolve_parent_mut<'a>(
    doc: &'a mut Value,
    path: &Path,
    auto_create: bool,
) -> Result<(&'a mut Value, Segment), PathError> {
    let terminal = path.last().cloned().ok_or(PathError::RootWrite)?;

    let mut current = doc;
    let last = path.len() - 1;
    for (i, seg) in path.segments()[..last].iter().enumerate() {
        let next = &path.segments()[i + 1];
        current = match (current, seg) {
            (Value::Object(map), Segment::Key(k)) => {
                if !map.contains_key(k) {
                    if !auto_create {
                        return Err(PathError::NotFound(prefix_string(path, i + 1)));
                    }
                    let fresh = match next {
                        Segment::Key(_) => Value::Object(Map::new()),
                        Segment::Index(_) => Value::Array(Vec::new()),
                    };
                    map.insert(k.clone(), fresh);
                }
                map.get_mut(k)
                    .ok_or_else(|| PathError::NotFound(prefix_string(path, i + 1)))?
            }
            (Value::Array(arr), Segment::Index(idx)) => {
                let len = arr.len();
                arr.get_mut(*idx).ok_or(PathError::IndexOutOfBounds {
                    path: prefix_string(path, i),
                    index: *idx,
                    len,
                })?
            }
            (other, Segment::Key(_)) => {
                return Err(PathError::TypeMismatch {
                    path: prefix_string(path, i),
                    expected: "map",
                    found: kind_of(other),
                })
            }
            (other, Segment::Index(_)) => {
                return Err(PathError::TypeMismatch {
                    path: prefix_string(path, i),
                    expected: "sequence",
                    found: kind_of(other),
                })
            }
        };
    }

    Ok((current, terminal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_path;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "name": "pack",
            "entities": [
                {"name": "Contract", "priority": "high"},
                {"name": "Party"}
            ],
            "metadata": {"author": "x"}
        })
    }

    #[test]
    fn get_nested() {
        let d = doc();
        let p = parse_path("entities[1].name").unwrap();
        assert_eq!(get(&d, &p), Some(&json!("Party")));
        assert_eq!(get(&d, &parse_path("missing").unwrap()), None);
    }

    #[test]
    fn resolve_root() {
        let d = doc();
        let r = resolve(&d, &Path::root(), false).unwrap();
        assert!(r.exists);
        assert!(r.parent.is_none());
        assert_eq!(r.value, Some(&d));
    }

    #[test]
    fn resolve_existing_key() {
        let d = doc();
        let r = resolve(&d, &parse_path("metadata.author").unwrap(), false).unwrap();
        assert!(r.exists);
        assert!(r.in_map());
        assert_eq!(r.value, Some(&json!("x")));
    }

    #[test]
    fn resolve_missing_terminal() {
        let d = doc();
        let p = parse_path("metadata.editor").unwrap();
        assert_eq!(
            resolve(&d, &p, false),
            Err(PathError::NotFound("metadata.editor".into()))
        );
        let r = resolve(&d, &p, true).unwrap();
        assert!(!r.exists);
        assert!(r.value.is_none());
    }

    #[test]
    fn resolve_missing_intermediate_fails_even_when_lenient() {
        let d = doc();
        let p = parse_path("nothing.here").unwrap();
        assert!(matches!(resolve(&d, &p, true), Err(PathError::NotFound(_))));
    }

    #[test]
    fn resolve_index_out_of_bounds() {
        let d = doc();
        let p = parse_path("entities[9]").unwrap();
        assert_eq!(
            resolve(&d, &p, true),
            Err(PathError::IndexOutOfBounds {
                path: "entities".into(),
                index: 9,
                len: 2
            })
        );
    }

    #[test]
    fn resolve_type_mismatch() {
        let d = doc();
        // Key segment over a sequence.
        let p = parse_path("entities.name").unwrap();
        assert!(matches!(
            resolve(&d, &p, false),
            Err(PathError::TypeMismatch { expected: "map", .. })
        ));
        // Index segment over a map.
        let p = parse_path("metadata[0]").unwrap();
        assert!(matches!(
            resolve(&d, &p, false),
            Err(PathError::TypeMismatch { expected: "sequence", .. })
        ));
    }

    #[test]
    fn parent_mut_rejects_root() {
        let mut d = doc();
        assert!(matches!(
            resolve_parent_mut(&mut d, &Path::root(), false),
            Err(PathError::RootWrite)
        ));
    }

    #[test]
    fn parent_mut_navigates_to_container() {
        let mut d = doc();
        let p = parse_path("entities[0].priority").unwrap();
        let (parent, seg) = resolve_parent_mut(&mut d, &p, false).unwrap();
        assert_eq!(seg, Segment::key("priority"));
        assert_eq!(parent["name"], json!("Contract"));
    }

    #[test]
    fn parent_mut_auto_creates_map_intermediate() {
        let mut d = doc();
        let p = parse_path("settings.display.theme").unwrap();
        let (parent, seg) = resolve_parent_mut(&mut d, &p, true).unwrap();
        assert!(parent.is_object());
        assert_eq!(seg, Segment::key("theme"));
        // The intermediates landed in the real tree.
        assert!(d["settings"]["display"].is_object());
    }

    #[test]
    fn parent_mut_auto_creates_sequence_for_index_successor() {
        let mut d = doc();
        let p = parse_path("tags[0]").unwrap();
        let (parent, _) = resolve_parent_mut(&mut d, &p, true).unwrap();
        assert!(parent.is_array());
        assert_eq!(d["tags"], json!([]));
    }

    #[test]
    fn parent_mut_without_auto_create_fails() {
        let mut d = doc();
        let p = parse_path("settings.display.theme").unwrap();
        assert_eq!(
            resolve_parent_mut(&mut d, &p, false),
            Err(PathError::NotFound("settings".into()))
        );
    }
}
