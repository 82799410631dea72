use crate::{path::DocumentPath, value::Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Document
///
/// One raw store document: a path plus a flat-to-nested field map.
/// Field lookup supports dotted paths (`address.city`) by walking
/// nested `Value::Map` entries.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Document {
    pub path: DocumentPath,
    pub fields: BTreeMap<String, Value>,
}

impl Document {
    #[must_use]
    pub fn new(path: DocumentPath) -> Self {
        Self {
            path,
            fields: BTreeMap::new(),
        }
    }

    /// Set a top-level field.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        self.path.id()
    }

    /// Look up a field by dotted path. Missing segments yield `None`.
    #[must_use]
    pub fn get(&self, field_path: &str) -> Option<&Value> {
        let mut parts = field_path.split('.');
        let mut current = self.fields.get(parts.next()?)?;

        for part in parts {
            match current {
                Value::Map(entries) => current = entries.get(part)?,
                _ => return None,
            }
        }

        Some(current)
    }

    /// Field value used in comparisons: missing fields read as null.
    #[must_use]
    pub fn get_or_null(&self, field_path: &str) -> Value {
        self.get(field_path).cloned().unwrap_or(Value::Null)
    }
}

///
/// DocumentPool
///
/// All documents loaded for one pipeline invocation, keyed by full
/// path. The execution handler fills it (roots, included references,
/// sub-resource children); the convert handler drains it bottom-up.
///

#[derive(Clone, Debug, Default)]
pub struct DocumentPool {
    by_path: BTreeMap<String, Document>,
}

impl DocumentPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, doc: Document) {
        self.by_path.insert(doc.path.to_string(), doc);
    }

    #[must_use]
    pub fn get(&self, path: &DocumentPath) -> Option<&Document> {
        self.by_path.get(&path.to_string())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// Direct children of `parent` in `collection`, in path order.
    #[must_use]
    pub fn children_of(&self, parent: &DocumentPath, collection: &str) -> Vec<&Document> {
        // Path-ordered scan bounded by the parent prefix.
        let prefix = format!("{parent}/{collection}/");
        self.by_path
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(_, doc)| doc)
            .filter(|doc| doc.path.is_child_of(parent, collection))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.by_path.values()
    }
}
