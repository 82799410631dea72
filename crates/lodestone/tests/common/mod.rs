//! Entity mappings and store seeding shared by the integration tests:
//! a root `Product` owning a `Reviews` sub-resource collection.

use lodestone::core::{
    document::Document,
    materialize::{deserialize_children, DeserializeError},
    model::{
        CollectionKind, ConstructorSpec, EntityModel, NavigationKind, NavigationModel,
        PropertyKind, PropertyModel,
    },
    path::DocumentPath,
    store::memory::MemoryStore,
    traits::{ConstructorArgs, EntityKind, NavigationPayload},
    value::Value,
};
use std::sync::Arc;

///
/// Product
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub reviews: Vec<Review>,
}

pub static PRODUCT_MODEL: EntityModel = EntityModel {
    entity: "Product",
    collection: "Products",
    primary_key: "Id",
    properties: &[
        PropertyModel {
            name: "Id",
            field: "id",
            kind: PropertyKind::Text,
        },
        PropertyModel {
            name: "Name",
            field: "name",
            kind: PropertyKind::Text,
        },
        PropertyModel {
            name: "Category",
            field: "category",
            kind: PropertyKind::Text,
        },
        PropertyModel {
            name: "Price",
            field: "price",
            kind: PropertyKind::Double,
        },
    ],
    navigations: &[NavigationModel {
        name: "Reviews",
        kind: NavigationKind::Collection {
            kind: CollectionKind::List,
        },
        target_collection: "Reviews",
        target: &REVIEW_MODEL,
    }],
    constructors: &[],
};

impl EntityKind for Product {
    const MODEL: &'static EntityModel = &PRODUCT_MODEL;

    fn default_instance() -> Option<Self> {
        Some(Self::default())
    }

    fn set_property(&mut self, property: &str, value: Value) -> Result<(), DeserializeError> {
        if value.is_null() {
            return Ok(());
        }
        match property {
            "Id" => self.id = text(property, value)?,
            "Name" => self.name = text(property, value)?,
            "Category" => self.category = text(property, value)?,
            "Price" => self.price = double(property, value)?,
            _ => {
                return Err(DeserializeError::UnknownProperty {
                    entity: "Product",
                    property: property.to_string(),
                });
            }
        }
        Ok(())
    }

    fn set_navigation(
        &mut self,
        navigation: &str,
        payload: NavigationPayload<'_>,
    ) -> Result<(), DeserializeError> {
        match (navigation, payload) {
            ("Reviews", NavigationPayload::Collection { docs, pool }) => {
                self.reviews = deserialize_children(&docs, pool, CollectionKind::List)?;
                Ok(())
            }
            ("Reviews", _) => Ok(()),
            _ => Err(DeserializeError::UnknownNavigation {
                entity: "Product",
                navigation: navigation.to_string(),
            }),
        }
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("Id", Value::Text(self.id.clone())),
            ("Name", Value::Text(self.name.clone())),
            ("Category", Value::Text(self.category.clone())),
            ("Price", Value::Double(self.price)),
        ]
    }
}

///
/// Review
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Review {
    pub id: String,
    pub rating: f64,
    pub author: String,
}

pub static REVIEW_MODEL: EntityModel = EntityModel {
    entity: "Review",
    collection: "Reviews",
    primary_key: "Id",
    properties: &[
        PropertyModel {
            name: "Id",
            field: "id",
            kind: PropertyKind::Text,
        },
        PropertyModel {
            name: "Rating",
            field: "rating",
            kind: PropertyKind::Double,
        },
        PropertyModel {
            name: "Author",
            field: "author",
            kind: PropertyKind::Text,
        },
    ],
    navigations: &[],
    constructors: &[ConstructorSpec {
        params: &["Id", "Rating", "Author"],
    }],
};

impl EntityKind for Review {
    const MODEL: &'static EntityModel = &REVIEW_MODEL;

    fn construct(args: &ConstructorArgs) -> Result<Self, DeserializeError> {
        Ok(Self {
            id: args.text("Id")?,
            rating: args.double("Rating")?,
            author: args.text("Author")?,
        })
    }

    fn set_property(&mut self, property: &str, value: Value) -> Result<(), DeserializeError> {
        Err(DeserializeError::UnknownProperty {
            entity: "Review",
            property: format!("{property} = {value}"),
        })
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("Id", Value::Text(self.id.clone())),
            ("Rating", Value::Double(self.rating)),
            ("Author", Value::Text(self.author.clone())),
        ]
    }
}

fn text(property: &str, value: Value) -> Result<String, DeserializeError> {
    match value {
        Value::Text(s) | Value::Enum(s) => Ok(s),
        other => Err(mismatch(property, "text", &other)),
    }
}

fn double(property: &str, value: Value) -> Result<f64, DeserializeError> {
    value
        .as_double()
        .ok_or_else(|| mismatch(property, "double", &value))
}

fn mismatch(property: &str, expected: &'static str, found: &Value) -> DeserializeError {
    DeserializeError::TypeMismatch {
        entity: "fixture",
        property: property.to_string(),
        expected,
        found: found.to_string(),
    }
}

/// Three products (two electronics, one book), reviews under the
/// first.
#[must_use]
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());

    let p1 = DocumentPath::new("Products", "p1");
    store.insert(
        Document::new(p1.clone())
            .with("name", "Laptop")
            .with("category", "Electronics")
            .with("price", 1200.0),
    );
    store.insert(
        Document::new(DocumentPath::new("Products", "p2"))
            .with("name", "Headphones")
            .with("category", "Electronics")
            .with("price", 199.0),
    );
    store.insert(
        Document::new(DocumentPath::new("Products", "p3"))
            .with("name", "Novel")
            .with("category", "Books")
            .with("price", 14.0),
    );

    store.insert(
        Document::new(p1.child("Reviews", "r1"))
            .with("rating", 5.0)
            .with("author", "Anna"),
    );
    store.insert(
        Document::new(p1.child("Reviews", "r2"))
            .with("rating", 3.0)
            .with("author", "Ben"),
    );

    store
}
