///
/// Runtime entity models.
///
/// `EntityModel` is the provider's source of truth for how an entity
/// type maps onto store documents: property/field names, declared
/// kinds (driving value conversion), navigations, and the constructor
/// shapes the deserializer may use. Instances are `'static` data
/// declared alongside each entity type.
///

#[derive(Debug)]
pub struct EntityModel {
    /// Host type name, used in diagnostics.
    pub entity: &'static str,

    /// Root collection this entity persists into.
    pub collection: &'static str,

    /// Property holding the document id.
    pub primary_key: &'static str,

    pub properties: &'static [PropertyModel],
    pub navigations: &'static [NavigationModel],

    /// Declared constructor shapes in preference order.
    pub constructors: &'static [ConstructorSpec],
}

impl EntityModel {
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&'static PropertyModel> {
        self.properties.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn property_by_field(&self, field: &str) -> Option<&'static PropertyModel> {
        self.properties.iter().find(|p| p.field == field)
    }

    #[must_use]
    pub fn navigation(&self, name: &str) -> Option<&'static NavigationModel> {
        self.navigations.iter().find(|n| n.name == name)
    }

    #[must_use]
    pub fn is_primary_key(&self, property: &str) -> bool {
        self.primary_key == property
    }

    /// Store field name for a property, defaulting to the property name.
    #[must_use]
    pub fn field_of(&self, property: &str) -> &'static str {
        self.property(property).map_or_else(|| "", |p| p.field)
    }
}

///
/// PropertyModel
///

#[derive(Debug)]
pub struct PropertyModel {
    /// Host property name.
    pub name: &'static str,

    /// Store field name.
    pub field: &'static str,

    pub kind: PropertyKind,
}

///
/// PropertyKind
///
/// Declared property type, driving uniform value conversion during
/// deserialization (enum parse, decimal cast, timestamp normalization,
/// reference mapping).
///

#[derive(Debug)]
pub enum PropertyKind {
    Bool,
    Int,
    /// Host decimal, stored as a double.
    Decimal,
    Double,
    Text,
    Bytes,
    Timestamp,
    GeoPoint,
    /// Host enum, stored as its variant name.
    Enum { variants: &'static [&'static str] },
    /// Document reference into a foreign collection.
    Reference { collection: &'static str },
    List,
    Map,
}

///
/// NavigationModel
///

#[derive(Debug)]
pub struct NavigationModel {
    pub name: &'static str,
    pub kind: NavigationKind,

    /// Collection the target documents live in: a root collection for
    /// reference navigations, a sub-resource collection name for
    /// collection navigations.
    pub target_collection: &'static str,

    /// Target entity's own model, for child property mapping.
    pub target: &'static EntityModel,
}

impl NavigationModel {
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self.kind, NavigationKind::Collection { .. })
    }
}

///
/// NavigationKind
///

#[derive(Debug)]
pub enum NavigationKind {
    /// Single referenced document; `field` holds the reference path.
    Reference {
        field: &'static str,
        required: bool,
    },

    /// Owned sub-resource collection under the parent document.
    Collection { kind: CollectionKind },
}

///
/// CollectionKind
///
/// Capability class of a collection navigation's declared static
/// type. Drives instantiation and population strategy during
/// deserialization: lists preserve order, sets de-duplicate by
/// primary key, other shapes are populated element-by-element with
/// no further guarantees.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CollectionKind {
    List,
    Set,
    Other,
}

///
/// ConstructorSpec
///
/// One declared constructor: the property names covered by its
/// parameters, in declaration order. The deserializer invokes the
/// first declared spec; properties outside it are assigned through
/// setters.
///

#[derive(Debug)]
pub struct ConstructorSpec {
    pub params: &'static [&'static str],
}
