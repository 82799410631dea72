use crate::{
    document::Document, materialize::DeserializeError, traits::EntityKind, value::Value,
};

/// Serialize an entity into its store document.
///
/// The primary key becomes the path's id segment and is not written as
/// a field; enum values are written as their variant names; null
/// fields are omitted entirely, matching how the deserializer treats
/// absent fields.
pub fn to_document<E: EntityKind>(entity: &E) -> Result<Document, DeserializeError> {
    let model = E::MODEL;
    let mut doc = Document::new(entity.document_path()?);

    for (property, value) in entity.field_values() {
        if model.is_primary_key(property) || value.is_null() {
            continue;
        }
        let Some(prop) = model.property(property) else {
            continue;
        };
        doc.fields.insert(prop.field.to_string(), store_form(value));
    }

    Ok(doc)
}

/// Rewrite host-side values into what the store actually holds.
fn store_form(value: Value) -> Value {
    match value {
        Value::Enum(name) => Value::Text(name),
        Value::List(items) => Value::List(items.into_iter().map(store_form).collect()),
        Value::Map(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, store_form(v)))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        document::DocumentPool,
        materialize::deserialize,
        path::DocumentPath,
        test_fixtures::{Customer, CustomerStatus},
    };

    #[test]
    fn entities_round_trip_through_their_documents() {
        let customer = Customer {
            id: "c1".into(),
            name: "Anna".into(),
            status: CustomerStatus::Disabled,
            balance: 12.5,
            tags: vec!["vip".into(), "eu".into()],
            region: Some(DocumentPath::new("Regions", "eu-west")),
            orders: vec![],
        };

        let doc = to_document(&customer).unwrap();
        assert_eq!(doc.path, DocumentPath::new("Customers", "c1"));
        // The id lives in the path, not the fields.
        assert!(doc.get("id").is_none());
        // Enums are stored as variant names.
        assert_eq!(doc.get("status"), Some(&Value::Text("Disabled".into())));

        let back: Customer = deserialize(&doc, &DocumentPool::new(), false).unwrap();
        assert_eq!(back, customer);
    }

    #[test]
    fn invalid_primary_keys_fail_serialization() {
        // The default id is empty, which cannot become a path segment.
        let customer = Customer::default();
        assert!(to_document(&customer).is_err());
    }
}
