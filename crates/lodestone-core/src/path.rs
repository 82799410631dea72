use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

///
/// DocumentPath
///
/// Slash-delimited address of a document inside the store:
/// alternating collection and document-id segments, always of even
/// length (`customers/c1`, `customers/c1/orders/o1`).
///
/// Paths are the join currency of the provider: reference fields hold
/// them, the document pool is keyed by them, and sub-resource lookups
/// resolve children by parent-path prefix.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentPath {
    segments: Vec<String>,
}

impl DocumentPath {
    /// Create a root-level document path.
    #[must_use]
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            segments: vec![collection.into(), id.into()],
        }
    }

    /// Parse a slash-delimited path.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let segments: Vec<String> = raw
            .split('/')
            .map(str::to_string)
            .collect();

        if segments.len() < 2 || segments.len() % 2 != 0 {
            return Err(PathError::OddSegmentCount { path: raw.into() });
        }
        if segments.iter().any(String::is_empty) {
            return Err(PathError::EmptySegment { path: raw.into() });
        }

        Ok(Self { segments })
    }

    /// Address a child document in a sub-resource collection.
    #[must_use]
    pub fn child(&self, collection: impl Into<String>, id: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(collection.into());
        segments.push(id.into());
        Self { segments }
    }

    /// Parent document path, if this is a sub-resource document.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() <= 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 2].to_vec(),
        })
    }

    /// Collection segment this document belongs to.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.segments[self.segments.len() - 2]
    }

    /// Document id segment.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// True if `self` is a direct child of `parent` in `collection`.
    #[must_use]
    pub fn is_child_of(&self, parent: &Self, collection: &str) -> bool {
        self.segments.len() == parent.segments.len() + 2
            && self.segments.starts_with(&parent.segments)
            && self.collection() == collection
    }

    /// True for root-level documents (collection/id).
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.len() == 2
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl TryFrom<String> for DocumentPath {
    type Error = PathError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<DocumentPath> for String {
    fn from(path: DocumentPath) -> Self {
        path.to_string()
    }
}

///
/// PathError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum PathError {
    #[error("document path '{path}' must have an even, non-zero number of segments")]
    OddSegmentCount { path: String },

    #[error("document path '{path}' contains an empty segment")]
    EmptySegment { path: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_nested_paths() {
        let path = DocumentPath::parse("customers/c1/orders/o1").unwrap();
        assert_eq!(path.collection(), "orders");
        assert_eq!(path.id(), "o1");
        assert_eq!(path.to_string(), "customers/c1/orders/o1");
        assert_eq!(path.parent().unwrap().to_string(), "customers/c1");
    }

    #[test]
    fn parse_rejects_odd_and_empty_segments() {
        assert!(DocumentPath::parse("customers").is_err());
        assert!(DocumentPath::parse("customers/c1/orders").is_err());
        assert!(DocumentPath::parse("customers//orders/o1").is_err());
    }

    #[test]
    fn child_membership_requires_collection_match() {
        let parent = DocumentPath::new("customers", "c1");
        let order = parent.child("orders", "o1");
        assert!(order.is_child_of(&parent, "orders"));
        assert!(!order.is_child_of(&parent, "invoices"));
        assert!(!parent.is_child_of(&parent, "orders"));
    }
}
