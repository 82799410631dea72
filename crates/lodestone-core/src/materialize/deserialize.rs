use crate::{
    document::{Document, DocumentPool},
    materialize::DeserializeError,
    model::{CollectionKind, EntityModel, NavigationKind, PropertyKind, PropertyModel},
    path::DocumentPath,
    traits::{ConstructorArgs, EntityKind, NavigationPayload},
    value::Value,
};
use std::collections::BTreeMap;

/// Rebuild a typed entity from a raw document.
///
/// The construction strategy is picked from the type's declared
/// shape, never from the document: the first declared constructor
/// when one exists (covering all properties or a subset, remainder
/// via setters), otherwise a default instance with everything via
/// setters. Constructor parameters whose field the document does not
/// carry are supplied as nulls, since writes omit null fields.
///
/// Property values are converted to their declared kinds first, so
/// constructors and setters see uniform values. The primary key is
/// always drawn from the document path, never from a field.
pub fn deserialize<E: EntityKind>(
    doc: &Document,
    pool: &DocumentPool,
    lazy_references: bool,
) -> Result<E, DeserializeError> {
    deserialize_inner(doc, pool, lazy_references).map_err(|e| e.at(&doc.path, E::MODEL.entity))
}

fn deserialize_inner<E: EntityKind>(
    doc: &Document,
    pool: &DocumentPool,
    lazy_references: bool,
) -> Result<E, DeserializeError> {
    let model = E::MODEL;
    let values = converted_values(model, doc)?;

    let (mut entity, consumed) = construct_entity::<E>(model, &values)?;

    for property in model.properties {
        if consumed.contains(&property.name) {
            continue;
        }
        if let Some(value) = values.get(property.name) {
            entity.set_property(property.name, value.clone())?;
        }
    }

    assign_navigations(&mut entity, doc, pool, lazy_references)?;

    Ok(entity)
}

/// Pick a construction strategy and run it. Returns the entity plus
/// the property names the constructor consumed.
fn construct_entity<E: EntityKind>(
    model: &'static EntityModel,
    values: &BTreeMap<&'static str, Value>,
) -> Result<(E, Vec<&'static str>), DeserializeError> {
    // First declared constructor wins; selection follows the type's
    // shape, not the document's. Parameters whose field the document
    // does not carry arrive as nulls, and the constructor decides what
    // an absent value means.
    if let Some(spec) = model.constructors.first() {
        let args = ConstructorArgs::new(
            model.entity,
            spec.params
                .iter()
                .map(|p| (*p, values.get(p).cloned().unwrap_or(Value::Null)))
                .collect(),
        );
        let entity = E::construct(&args)?;
        return Ok((entity, spec.params.to_vec()));
    }

    if let Some(entity) = E::default_instance() {
        return Ok((entity, Vec::new()));
    }

    Err(DeserializeError::NoUsableConstructor {
        entity: model.entity,
    })
}

/// Converted property values by property name. Fields the document
/// does not carry are absent, not null.
fn converted_values(
    model: &'static EntityModel,
    doc: &Document,
) -> Result<BTreeMap<&'static str, Value>, DeserializeError> {
    let mut values = BTreeMap::new();

    for property in model.properties {
        if model.is_primary_key(property.name) {
            values.insert(property.name, Value::Text(doc.id().to_string()));
            continue;
        }
        if let Some(raw) = doc.get(property.field) {
            values.insert(property.name, convert_value(model, property, raw.clone())?);
        }
    }

    Ok(values)
}

/// Coerce a raw store value to the property's declared kind.
pub(crate) fn convert_value(
    model: &EntityModel,
    property: &PropertyModel,
    raw: Value,
) -> Result<Value, DeserializeError> {
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let mismatch = |expected: &'static str, found: &Value| DeserializeError::TypeMismatch {
        entity: model.entity,
        property: property.name.to_string(),
        expected,
        found: found.to_string(),
    };

    match &property.kind {
        PropertyKind::Bool => match raw {
            Value::Bool(_) => Ok(raw),
            other => Err(mismatch("bool", &other)),
        },

        PropertyKind::Int => match raw {
            Value::Int(_) => Ok(raw),
            other => Err(mismatch("int", &other)),
        },

        // Decimals and doubles share a store representation; integer
        // payloads widen.
        PropertyKind::Decimal | PropertyKind::Double => match raw {
            Value::Double(_) => Ok(raw),
            #[allow(clippy::cast_precision_loss)]
            Value::Int(n) => Ok(Value::Double(n as f64)),
            other => Err(mismatch("double", &other)),
        },

        PropertyKind::Text => match raw {
            Value::Text(_) => Ok(raw),
            other => Err(mismatch("text", &other)),
        },

        PropertyKind::Bytes => match raw {
            Value::Bytes(_) => Ok(raw),
            other => Err(mismatch("bytes", &other)),
        },

        PropertyKind::Timestamp => match raw {
            Value::Timestamp(_) => Ok(raw),
            other => Err(mismatch("timestamp", &other)),
        },

        PropertyKind::GeoPoint => match raw {
            Value::GeoPoint(_) => Ok(raw),
            other => Err(mismatch("geo point", &other)),
        },

        // Stored as the variant name; parsed case-insensitively back
        // to the canonical variant.
        PropertyKind::Enum { variants } => {
            let text = match &raw {
                Value::Text(s) | Value::Enum(s) => s,
                other => return Err(mismatch("enum text", other)),
            };
            variants
                .iter()
                .find(|v| v.eq_ignore_ascii_case(text))
                .map(|v| Value::Enum((*v).to_string()))
                .ok_or_else(|| DeserializeError::UnknownEnumVariant {
                    entity: model.entity,
                    property: property.name.to_string(),
                    value: text.clone(),
                })
        }

        PropertyKind::Reference { .. } => match raw {
            Value::Reference(_) => Ok(raw),
            Value::Text(s) => Ok(Value::Reference(DocumentPath::parse(&s)?)),
            other => Err(mismatch("reference", &other)),
        },

        PropertyKind::List => match raw {
            Value::List(_) => Ok(raw),
            other => Err(mismatch("list", &other)),
        },

        PropertyKind::Map => match raw {
            Value::Map(_) => Ok(raw),
            other => Err(mismatch("map", &other)),
        },
    }
}

/// Deliver each declared navigation to the entity.
fn assign_navigations<E: EntityKind>(
    entity: &mut E,
    doc: &Document,
    pool: &DocumentPool,
    lazy_references: bool,
) -> Result<(), DeserializeError> {
    for nav in E::MODEL.navigations {
        let payload = match &nav.kind {
            NavigationKind::Reference { field, .. } => match doc.get(field) {
                Some(Value::Reference(path)) => reference_payload(path, pool, lazy_references)?,
                Some(Value::Text(s)) => {
                    let path = DocumentPath::parse(s)?;
                    reference_payload(&path, pool, lazy_references)?
                }
                _ => NavigationPayload::Missing,
            },

            NavigationKind::Collection { .. } => NavigationPayload::Collection {
                docs: pool.children_of(&doc.path, nav.target_collection),
                pool,
            },
        };

        entity.set_navigation(nav.name, payload)?;
    }

    Ok(())
}

fn reference_payload<'a>(
    path: &DocumentPath,
    pool: &'a DocumentPool,
    lazy_references: bool,
) -> Result<NavigationPayload<'a>, DeserializeError> {
    if lazy_references {
        return Ok(NavigationPayload::Deferred(path.clone()));
    }
    Ok(match pool.get(path) {
        Some(doc) => NavigationPayload::Reference { doc, pool },
        None => NavigationPayload::Deferred(path.clone()),
    })
}

/// Deserialize a collection navigation's children, honoring the
/// declared collection capability: sets drop primary-key duplicates,
/// lists and other shapes keep arrival order.
///
/// Child reference navigations stay unresolved: a child pointing back
/// at its own parent would otherwise recurse without bound.
pub fn deserialize_children<C: EntityKind>(
    docs: &[&Document],
    pool: &DocumentPool,
    kind: CollectionKind,
) -> Result<Vec<C>, DeserializeError> {
    let mut out = Vec::with_capacity(docs.len());
    let mut seen: Vec<Value> = Vec::new();

    for doc in docs {
        let child: C = deserialize(doc, pool, true)?;

        if kind == CollectionKind::Set {
            let key = child.primary_key();
            if seen.iter().any(|k| k.same(&key)) {
                continue;
            }
            seen.push(key);
        }

        out.push(child);
    }

    Ok(out)
}
