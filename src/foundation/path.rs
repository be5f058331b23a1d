use crate::foundation::error::{ChartkitError, ChartkitResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// One step of a [`DataPath`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSeg {
    /// Object property.
    Key(String),
    /// Array position.
    Index(usize),
}

/// Address of a node inside a data tree, written `sections[0].items[2].name`.
///
/// The empty path addresses the root. Prefix tests are segment-aware: `width` is a prefix of
/// `width.unit` but not of `widthUnit`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataPath {
    segs: Vec<PathSeg>,
}

impl DataPath {
    /// The root path.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted path with optional `[n]` index suffixes.
    pub fn parse(src: &str) -> ChartkitResult<Self> {
        let src = src.trim();
        let mut segs = Vec::new();
        if src.is_empty() {
            return Ok(Self { segs });
        }

        let bytes = src.as_bytes();
        let mut i = 0usize;
        let mut expect_key = true;
        while i < bytes.len() {
            match bytes[i] {
                b'[' => {
                    let close = src[i..].find(']').map(|off| i + off).ok_or_else(|| {
                        ChartkitError::validation(format!("unclosed '[' in path '{src}'"))
                    })?;
                    let idx: usize = src[i + 1..close].trim().parse().map_err(|_| {
                        ChartkitError::validation(format!(
                            "invalid index '{}' in path '{src}'",
                            &src[i + 1..close]
                        ))
                    })?;
                    segs.push(PathSeg::Index(idx));
                    i = close + 1;
                    expect_key = false;
                }
                b'.' => {
                    if expect_key {
                        return Err(ChartkitError::validation(format!(
                            "empty segment in path '{src}'"
                        )));
                    }
                    i += 1;
                    expect_key = true;
                    if i == bytes.len() {
                        return Err(ChartkitError::validation(format!(
                            "trailing '.' in path '{src}'"
                        )));
                    }
                }
                b']' => {
                    return Err(ChartkitError::validation(format!(
                        "unexpected ']' in path '{src}'"
                    )));
                }
                _ => {
                    if !expect_key {
                        return Err(ChartkitError::validation(format!(
                            "expected '.' or '[' at byte {i} in path '{src}'"
                        )));
                    }
                    let start = i;
                    while i < bytes.len() && !matches!(bytes[i], b'.' | b'[' | b']') {
                        i += 1;
                    }
                    segs.push(PathSeg::Key(src[start..i].to_owned()));
                    expect_key = false;
                }
            }
        }

        Ok(Self { segs })
    }

    /// Path segments from the root down.
    pub fn segments(&self) -> &[PathSeg] {
        &self.segs
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.segs.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segs.len()
    }

    /// Whether the path has no segments (same as [`DataPath::is_root`]).
    pub fn is_empty(&self) -> bool {
        self.segs.is_empty()
    }

    /// Child path for an object property.
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segs = self.segs.clone();
        segs.push(PathSeg::Key(key.into()));
        Self { segs }
    }

    /// Child path for an array position.
    pub fn index(&self, idx: usize) -> Self {
        let mut segs = self.segs.clone();
        segs.push(PathSeg::Index(idx));
        Self { segs }
    }

    /// Concatenate `rest` below this path.
    pub fn join(&self, rest: &DataPath) -> Self {
        let mut segs = Vec::with_capacity(self.segs.len() + rest.segs.len());
        segs.extend_from_slice(&self.segs);
        segs.extend_from_slice(&rest.segs);
        Self { segs }
    }

    /// Segment-aware prefix test (a path starts with itself and with the root).
    pub fn starts_with(&self, prefix: &DataPath) -> bool {
        self.segs.len() >= prefix.segs.len() && self.segs[..prefix.segs.len()] == prefix.segs[..]
    }

    /// True when one path is a prefix of the other.
    pub fn is_related(&self, other: &DataPath) -> bool {
        self.starts_with(other) || other.starts_with(self)
    }

    /// Last segment, if any.
    pub fn last(&self) -> Option<&PathSeg> {
        self.segs.last()
    }

    /// When the last segment is an index, split into `(collection, index)`.
    pub fn split_index(&self) -> Option<(DataPath, usize)> {
        match self.segs.last() {
            Some(PathSeg::Index(i)) => Some((
                Self {
                    segs: self.segs[..self.segs.len() - 1].to_vec(),
                },
                *i,
            )),
            _ => None,
        }
    }

    /// Split at the deepest index segment: `(collection, index)`, ignoring anything after it.
    pub fn deepest_index(&self) -> Option<(DataPath, usize)> {
        let pos = self
            .segs
            .iter()
            .rposition(|s| matches!(s, PathSeg::Index(_)))?;
        let PathSeg::Index(i) = self.segs[pos] else {
            return None;
        };
        Some((
            Self {
                segs: self.segs[..pos].to_vec(),
            },
            i,
        ))
    }

    /// Resolve the path against a data tree.
    pub fn lookup<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        let mut cur = root;
        for seg in &self.segs {
            cur = match (seg, cur) {
                (PathSeg::Key(k), Value::Object(map)) => map.get(k)?,
                (PathSeg::Index(i), Value::Array(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(cur)
    }
}

impl fmt::Display for DataPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segs.iter().enumerate() {
            match seg {
                PathSeg::Key(k) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(k)?;
                }
                PathSeg::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for DataPath {
    type Err = ChartkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DataPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/path.rs"]
mod tests;
