//! Type definitions for domain-pack paths.

use std::fmt;

use serde_json::Value;

/// One step of a [`Path`].
///
/// A segment is either an object key or a sequence index; the two are
/// distinct variants so a numeric map key can never be confused with an
/// array position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Lookup by key in an ordered map.
    Key(String),
    /// Lookup by position in a sequence.
    Index(usize),
}

impl Segment {
    pub fn key(s: impl Into<String>) -> Self {
        Segment::Key(s.into())
    }

    pub fn index(i: usize) -> Self {
        Segment::Index(i)
    }

    /// Returns the key name if this is a key segment.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Segment::Key(k) => Some(k),
            Segment::Index(_) => None,
        }
    }

    /// Returns the index if this is an index segment.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Key(_) => None,
            Segment::Index(i) => Some(*i),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => f.write_str(k),
            Segment::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// An ordered list of segments addressing a location in a document.
///
/// The empty path addresses the document root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// The root path (no segments).
    pub fn root() -> Self {
        Path { segments: Vec::new() }
    }

    pub fn new(segments: Vec<Segment>) -> Self {
        Path { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn first(&self) -> Option<&Segment> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Returns the path without its terminal segment, or `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Path {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Returns a new path with `segment` appended.
    pub fn child(&self, segment: Segment) -> Path {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Path { segments }
    }

    /// True if `self` is a prefix of `other` (or equal to it).
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        if self.segments.len() > other.segments.len() {
            return false;
        }
        self.segments
            .iter()
            .zip(other.segments.iter())
            .all(|(a, b)| a == b)
    }
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Path { segments }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            match seg {
                Segment::Key(k) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(k)?;
                }
                Segment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for Path {
    type Err = crate::PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parse_path(s)
    }
}

/// The result of resolving a [`Path`] against a document.
///
/// Holds the parent container so a subsequent write lands in the correct
/// container rather than in a detached value.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRef<'a> {
    /// The container holding the terminal location. `None` for the root.
    pub parent: Option<&'a Value>,
    /// The terminal segment. `None` for the root.
    pub segment: Option<Segment>,
    /// The value at the location, if it exists.
    pub value: Option<&'a Value>,
    /// Whether the terminal location currently exists.
    pub exists: bool,
}

impl<'a> NodeRef<'a> {
    /// True if the parent container is a sequence.
    pub fn in_sequence(&self) -> bool {
        matches!(self.parent, Some(Value::Array(_)))
    }

    /// True if the parent container is a map.
    pub fn in_map(&self) -> bool {
        matches!(self.parent, Some(Value::Object(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trip() {
        let path = Path::new(vec![
            Segment::key("entities"),
            Segment::index(0),
            Segment::key("name"),
        ]);
        assert_eq!(path.to_string(), "entities[0].name");
        let reparsed: Path = "entities[0].name".parse().unwrap();
        assert_eq!(reparsed, path);
    }

    #[test]
    fn parent_of_root_is_none() {
        assert!(Path::root().parent().is_none());
        let p: Path = "a.b".parse().unwrap();
        assert_eq!(p.parent().unwrap().to_string(), "a");
    }

    #[test]
    fn prefix_check() {
        let parent: Path = "entities".parse().unwrap();
        let child: Path = "entities[2].name".parse().unwrap();
        assert!(parent.is_prefix_of(&child));
        assert!(!child.is_prefix_of(&parent));
    }
}
