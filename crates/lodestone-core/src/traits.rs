use crate::{
    document::{Document, DocumentPool},
    materialize::DeserializeError,
    model::EntityModel,
    path::DocumentPath,
    value::Value,
};
use std::collections::BTreeMap;

///
/// EntityKind
///
/// Contract between the provider and a persistable entity type.
///
/// Implementations are mechanical: `MODEL` declares the runtime
/// mapping, `construct` invokes the declared constructor shape,
/// `set_property` is the setter surface for uncovered properties, and
/// `field_values` is the serialization side. A schema layer would
/// generate these; here they are written by hand per entity.
///

pub trait EntityKind: Sized + Send + Sync + 'static {
    const MODEL: &'static EntityModel;

    /// Invoke a declared constructor with the given parameter values.
    ///
    /// Called only for constructor specs listed in `MODEL`; entities
    /// with no declared constructors never receive this call.
    fn construct(args: &ConstructorArgs) -> Result<Self, DeserializeError> {
        let _ = args;
        Err(DeserializeError::NoUsableConstructor {
            entity: Self::MODEL.entity,
        })
    }

    /// Default instance for the default-construct-then-set strategy.
    fn default_instance() -> Option<Self> {
        None
    }

    /// Assign one property by name. Values arrive already converted
    /// to the property's declared kind.
    fn set_property(&mut self, property: &str, value: Value) -> Result<(), DeserializeError>;

    /// Assign one navigation from loaded documents.
    fn set_navigation(
        &mut self,
        navigation: &str,
        payload: NavigationPayload<'_>,
    ) -> Result<(), DeserializeError> {
        let _ = (navigation, payload);
        Ok(())
    }

    /// Current property values by property name, for serialization.
    fn field_values(&self) -> Vec<(&'static str, Value)>;

    /// Primary key value drawn from the property map.
    fn primary_key(&self) -> Value {
        self.field_values()
            .into_iter()
            .find(|(name, _)| *name == Self::MODEL.primary_key)
            .map_or(Value::Null, |(_, value)| value)
    }

    /// Document path this entity persists at.
    fn document_path(&self) -> Result<DocumentPath, DeserializeError> {
        match self.primary_key() {
            Value::Text(id) if !id.is_empty() => {
                Ok(DocumentPath::new(Self::MODEL.collection, id))
            }
            other => Err(DeserializeError::InvalidPrimaryKey {
                entity: Self::MODEL.entity,
                value: other.to_string(),
            }),
        }
    }
}

///
/// ConstructorArgs
///
/// Converted property values handed to `EntityKind::construct`,
/// keyed by property name.
///

#[derive(Debug)]
pub struct ConstructorArgs {
    entity: &'static str,
    values: BTreeMap<&'static str, Value>,
}

impl ConstructorArgs {
    #[must_use]
    pub fn new(entity: &'static str, values: BTreeMap<&'static str, Value>) -> Self {
        Self { entity, values }
    }

    pub fn get(&self, property: &str) -> Result<Value, DeserializeError> {
        self.values
            .get(property)
            .cloned()
            .ok_or(DeserializeError::MissingConstructorValue {
                entity: self.entity,
                property: property.to_string(),
            })
    }

    pub fn text(&self, property: &str) -> Result<String, DeserializeError> {
        match self.get(property)? {
            Value::Text(s) | Value::Enum(s) => Ok(s),
            other => Err(self.mismatch(property, "text", &other)),
        }
    }

    pub fn int(&self, property: &str) -> Result<i64, DeserializeError> {
        match self.get(property)? {
            Value::Int(n) => Ok(n),
            other => Err(self.mismatch(property, "int", &other)),
        }
    }

    pub fn double(&self, property: &str) -> Result<f64, DeserializeError> {
        self.get(property)?
            .as_double()
            .ok_or_else(|| self.mismatch(property, "double", &Value::Null))
    }

    pub fn boolean(&self, property: &str) -> Result<bool, DeserializeError> {
        match self.get(property)? {
            Value::Bool(b) => Ok(b),
            other => Err(self.mismatch(property, "bool", &other)),
        }
    }

    fn mismatch(&self, property: &str, expected: &'static str, found: &Value) -> DeserializeError {
        DeserializeError::TypeMismatch {
            entity: self.entity,
            property: property.to_string(),
            expected,
            found: found.to_string(),
        }
    }
}

///
/// NavigationPayload
///
/// Loaded navigation data delivered to `EntityKind::set_navigation`.
/// Children arrive as raw documents plus the invocation's document
/// pool, so the entity deserializes its own child type and nested
/// references still resolve.
///

pub enum NavigationPayload<'a> {
    /// Referenced document, eagerly loaded.
    Reference {
        doc: &'a Document,
        pool: &'a DocumentPool,
    },

    /// Reference left unresolved (lazy-reference configuration).
    Deferred(DocumentPath),

    /// Sub-resource children, already filtered and ordered by the
    /// execution handler.
    Collection {
        docs: Vec<&'a Document>,
        pool: &'a DocumentPool,
    },

    /// Navigation had no data to assign.
    Missing,
}

///
/// DocRef
///
/// Handle for a reference navigation: a document path plus the
/// resolved entity when the reference was eager-loaded. With
/// lazy references configured, handles stay unresolved and callers
/// re-fetch through the session when needed.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocRef<E> {
    path: Option<DocumentPath>,
    entity: Option<Box<E>>,
}

impl<E> DocRef<E> {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            path: None,
            entity: None,
        }
    }

    #[must_use]
    pub const fn unresolved(path: DocumentPath) -> Self {
        Self {
            path: Some(path),
            entity: None,
        }
    }

    #[must_use]
    pub fn resolved(path: DocumentPath, entity: E) -> Self {
        Self {
            path: Some(path),
            entity: Some(Box::new(entity)),
        }
    }

    #[must_use]
    pub const fn path(&self) -> Option<&DocumentPath> {
        self.path.as_ref()
    }

    #[must_use]
    pub fn get(&self) -> Option<&E> {
        self.entity.as_deref()
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.entity.is_some()
    }
}
