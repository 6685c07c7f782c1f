//! Normalized JSON pointers used as resource paths.
//!
//! Pointers follow RFC 6901 escaping. Both `""` and `"/"` denote the root and
//! a single trailing slash is dropped, so `/features/` and `/features` are the
//! same resource. Empty interior segments (`/a//b`) are rejected.
//!
//! Ordering is segment-wise, which keeps every descendant of a pointer in one
//! contiguous run directly after it. The resolver relies on that to scan
//! subtrees with a single range query.

use crate::error::{PolicyError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// A parsed, normalized JSON pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JsonPointer {
    segments: Vec<String>,
}

impl JsonPointer {
    /// The root pointer `/`.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a pointer from unescaped segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(PolicyError::InvalidPointer(format!("{:?}", segments)));
        }
        Ok(Self { segments })
    }

    /// Parse a pointer string.
    pub fn parse(value: &str) -> Result<Self> {
        if value.is_empty() || value == "/" {
            return Ok(Self::root());
        }
        let Some(body) = value.strip_prefix('/') else {
            return Err(PolicyError::InvalidPointer(value.to_string()));
        };
        let body = body.strip_suffix('/').unwrap_or(body);

        let mut segments = Vec::new();
        for raw in body.split('/') {
            if raw.is_empty() {
                return Err(PolicyError::InvalidPointer(value.to_string()));
            }
            segments.push(unescape(raw).ok_or_else(|| PolicyError::InvalidPointer(value.to_string()))?);
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments; the root has depth 0.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn parent(&self) -> Option<JsonPointer> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Append one unescaped segment.
    pub fn child(&self, segment: impl Into<String>) -> JsonPointer {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// True if `self` equals `ancestor` or lies below it.
    pub fn starts_with(&self, ancestor: &JsonPointer) -> bool {
        self.segments.starts_with(&ancestor.segments)
    }

    /// Walk from this pointer up to the root, most specific first.
    pub fn ancestors(&self) -> impl Iterator<Item = &[String]> + '_ {
        (0..=self.segments.len()).rev().map(move |n| &self.segments[..n])
    }
}

impl Borrow<[String]> for JsonPointer {
    fn borrow(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{}", escape(segment))?;
        }
        Ok(())
    }
}

impl FromStr for JsonPointer {
    type Err = PolicyError;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl Serialize for JsonPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for JsonPointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '~' {
            match chars.next() {
                Some('0') => out.push('~'),
                Some('1') => out.push('/'),
                _ => return None,
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_forms() {
        assert!(JsonPointer::parse("/").unwrap().is_root());
        assert!(JsonPointer::parse("").unwrap().is_root());
        assert_eq!(JsonPointer::root().to_string(), "/");
    }

    #[test]
    fn test_parse_and_display() {
        let pointer = JsonPointer::parse("/features/temperature").unwrap();
        assert_eq!(pointer.segments(), ["features", "temperature"]);
        assert_eq!(pointer.depth(), 2);
        assert_eq!(pointer.to_string(), "/features/temperature");
    }

    #[test]
    fn test_trailing_slash_is_normalized() {
        let pointer = JsonPointer::parse("/features/").unwrap();
        assert_eq!(pointer, JsonPointer::parse("/features").unwrap());
    }

    #[test]
    fn test_escapes() {
        let pointer = JsonPointer::parse("/a~1b/c~0d").unwrap();
        assert_eq!(pointer.segments(), ["a/b", "c~d"]);
        assert_eq!(pointer.to_string(), "/a~1b/c~0d");
    }

    #[test]
    fn test_malformed_pointers() {
        for bad in ["features", "/a//b", "/a/~2", "/a~"] {
            assert!(
                matches!(JsonPointer::parse(bad), Err(PolicyError::InvalidPointer(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_ancestors_most_specific_first() {
        let pointer = JsonPointer::parse("/a/b").unwrap();
        let walked: Vec<Vec<String>> = pointer.ancestors().map(|s| s.to_vec()).collect();
        assert_eq!(
            walked,
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["a".to_string()],
                vec![],
            ]
        );
    }

    #[test]
    fn test_descendants_sort_contiguously() {
        let mut pointers: Vec<JsonPointer> = ["/ab", "/a/z", "/b", "/a", "/a/b/c"]
            .iter()
            .map(|p| JsonPointer::parse(p).unwrap())
            .collect();
        pointers.sort();
        let rendered: Vec<String> = pointers.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["/a", "/a/b/c", "/a/z", "/ab", "/b"]);
    }

    #[test]
    fn test_parent_and_child() {
        let pointer = JsonPointer::parse("/a/b").unwrap();
        assert_eq!(pointer.parent().unwrap().to_string(), "/a");
        assert_eq!(pointer.child("c").to_string(), "/a/b/c");
        assert!(JsonPointer::root().parent().is_none());
        assert!(pointer.starts_with(&JsonPointer::parse("/a").unwrap()));
        assert!(!pointer.starts_with(&JsonPointer::parse("/ab").unwrap()));
    }
}
