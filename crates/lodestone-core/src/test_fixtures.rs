//! Hand-written entity mappings used across the unit tests: one
//! entity per construction strategy, an enum property, a reference
//! property, and a reference/collection navigation pair that points
//! back at itself.

use crate::{
    materialize::{deserialize, deserialize_children, DeserializeError},
    model::{
        CollectionKind, ConstructorSpec, EntityModel, NavigationKind, NavigationModel,
        PropertyKind, PropertyModel,
    },
    path::DocumentPath,
    traits::{ConstructorArgs, DocRef, EntityKind, NavigationPayload},
    value::Value,
};
use chrono::{DateTime, Utc};

///
/// CustomerStatus
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CustomerStatus {
    #[default]
    Active,
    Disabled,
}

impl CustomerStatus {
    pub const VARIANTS: &'static [&'static str] = &["Active", "Disabled"];

    fn from_variant(name: &str) -> Option<Self> {
        match name {
            "Active" => Some(Self::Active),
            "Disabled" => Some(Self::Disabled),
            _ => None,
        }
    }

    const fn variant(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Disabled => "Disabled",
        }
    }
}

///
/// Customer
///
/// Default-construct-then-set strategy; owns an `Orders` sub-resource
/// collection and a reference-typed `Region` property.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub status: CustomerStatus,
    pub balance: f64,
    pub tags: Vec<String>,
    pub region: Option<DocumentPath>,
    pub orders: Vec<Order>,
}

pub static CUSTOMER_MODEL: EntityModel = EntityModel {
    entity: "Customer",
    collection: "Customers",
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
            name: "Status",
            field: "status",
            kind: PropertyKind::Enum {
                variants: CustomerStatus::VARIANTS,
            },
        },
        PropertyModel {
            name: "Balance",
            field: "balance",
            kind: PropertyKind::Double,
        },
        PropertyModel {
            name: "Tags",
            field: "tags",
            kind: PropertyKind::List,
        },
        PropertyModel {
            name: "Region",
            field: "region",
            kind: PropertyKind::Reference {
                collection: "Regions",
            },
        },
    ],
    navigations: &[NavigationModel {
        name: "Orders",
        kind: NavigationKind::Collection {
            kind: CollectionKind::List,
        },
        target_collection: "Orders",
        target: &ORDER_MODEL,
    }],
    constructors: &[],
};

impl EntityKind for Customer {
    const MODEL: &'static EntityModel = &CUSTOMER_MODEL;

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
            "Status" => {
                let name = text(property, value)?;
                self.status = CustomerStatus::from_variant(&name).ok_or_else(|| {
                    DeserializeError::UnknownEnumVariant {
                        entity: "Customer",
                        property: property.to_string(),
                        value: name,
                    }
                })?;
            }
            "Balance" => self.balance = double(property, value)?,
            "Tags" => {
                self.tags = match value {
                    Value::List(items) => items
                        .into_iter()
                        .map(|item| text("Tags", item))
                        .collect::<Result<_, _>>()?,
                    other => return Err(mismatch(property, "list", &other)),
                };
            }
            "Region" => {
                self.region = match value {
                    Value::Reference(path) => Some(path),
                    other => return Err(mismatch(property, "reference", &other)),
                };
            }
            _ => {
                return Err(DeserializeError::UnknownProperty {
                    entity: "Customer",
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
            ("Orders", NavigationPayload::Collection { docs, pool }) => {
                self.orders = deserialize_children(&docs, pool, CollectionKind::List)?;
                Ok(())
            }
            ("Orders", _) => Ok(()),
            _ => Err(DeserializeError::UnknownNavigation {
                entity: "Customer",
                navigation: navigation.to_string(),
            }),
        }
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("Id", Value::Text(self.id.clone())),
            ("Name", Value::Text(self.name.clone())),
            ("Status", Value::Enum(self.status.variant().to_string())),
            ("Balance", Value::Double(self.balance)),
            (
                "Tags",
                Value::List(self.tags.iter().cloned().map(Value::Text).collect()),
            ),
            (
                "Region",
                self.region
                    .clone()
                    .map_or(Value::Null, Value::Reference),
            ),
        ]
    }
}

///
/// Order
///
/// Full-constructor strategy; carries a required reference navigation
/// back to its owning customer.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Order {
    pub id: String,
    pub total: f64,
    pub placed: Option<DateTime<Utc>>,
    pub customer: DocRef<Customer>,
}

pub static ORDER_MODEL: EntityModel = EntityModel {
    entity: "Order",
    collection: "Orders",
    primary_key: "Id",
    properties: &[
        PropertyModel {
            name: "Id",
            field: "id",
            kind: PropertyKind::Text,
        },
        PropertyModel {
            name: "Total",
            field: "total",
            kind: PropertyKind::Double,
        },
        PropertyModel {
            name: "Placed",
            field: "placed",
            kind: PropertyKind::Timestamp,
        },
    ],
    navigations: &[NavigationModel {
        name: "Customer",
        kind: NavigationKind::Reference {
            field: "customerRef",
            required: true,
        },
        target_collection: "Customers",
        target: &CUSTOMER_MODEL,
    }],
    constructors: &[ConstructorSpec {
        params: &["Id", "Total", "Placed"],
    }],
};

impl EntityKind for Order {
    const MODEL: &'static EntityModel = &ORDER_MODEL;

    fn construct(args: &ConstructorArgs) -> Result<Self, DeserializeError> {
        let placed = match args.get("Placed")? {
            Value::Timestamp(ts) => Some(ts),
            Value::Null => None,
            other => return Err(mismatch("Placed", "timestamp", &other)),
        };
        Ok(Self {
            id: args.text("Id")?,
            total: args.double("Total")?,
            placed,
            customer: DocRef::empty(),
        })
    }

    fn set_property(&mut self, property: &str, value: Value) -> Result<(), DeserializeError> {
        // The constructor covers every mapped property.
        Err(DeserializeError::UnknownProperty {
            entity: "Order",
            property: format!("{property} = {value}"),
        })
    }

    fn set_navigation(
        &mut self,
        navigation: &str,
        payload: NavigationPayload<'_>,
    ) -> Result<(), DeserializeError> {
        match (navigation, payload) {
            ("Customer", NavigationPayload::Reference { doc, pool }) => {
                let customer: Customer = deserialize(doc, pool, true)?;
                self.customer = DocRef::resolved(doc.path.clone(), customer);
                Ok(())
            }
            ("Customer", NavigationPayload::Deferred(path)) => {
                self.customer = DocRef::unresolved(path);
                Ok(())
            }
            ("Customer", _) => Ok(()),
            _ => Err(DeserializeError::UnknownNavigation {
                entity: "Order",
                navigation: navigation.to_string(),
            }),
        }
    }

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("Id", Value::Text(self.id.clone())),
            ("Total", Value::Double(self.total)),
            (
                "Placed",
                self.placed.map_or(Value::Null, Value::Timestamp),
            ),
        ]
    }
}

///
/// Product
///
/// Partial-constructor strategy: `Id` and `Name` through the
/// constructor, the rest through setters.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: f64,
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
    navigations: &[],
    constructors: &[ConstructorSpec {
        params: &["Id", "Name"],
    }],
};

impl EntityKind for Product {
    const MODEL: &'static EntityModel = &PRODUCT_MODEL;

    fn construct(args: &ConstructorArgs) -> Result<Self, DeserializeError> {
        Ok(Self {
            id: args.text("Id")?,
            name: args.text("Name")?,
            ..Self::default()
        })
    }

    fn set_property(&mut self, property: &str, value: Value) -> Result<(), DeserializeError> {
        if value.is_null() {
            return Ok(());
        }
        match property {
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

    fn field_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("Id", Value::Text(self.id.clone())),
            ("Name", Value::Text(self.name.clone())),
            ("Category", Value::Text(self.category.clone())),
            ("Price", Value::Double(self.price)),
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

/// Path helper used across tests.
#[must_use]
pub fn customer_path(id: &str) -> DocumentPath {
    DocumentPath::new("Customers", id)
}
