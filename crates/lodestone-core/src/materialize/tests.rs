use crate::{
    document::{Document, DocumentPool},
    materialize::{deserialize, materialize_rows, DeserializeError},
    path::DocumentPath,
    query::{
        plan::{FilterOp, OrderClause, OrderDirection, ProjectedField, ProjectionKind},
        resolve::{ResolvedFilter, ResolvedProjection, ResolvedSubResource},
    },
    serialize::to_document,
    test_fixtures::{Customer, CustomerStatus, Order, Product},
    traits::DocRef,
    value::Value,
};
use std::collections::BTreeMap;

fn customer_doc(id: &str) -> Document {
    Document::new(DocumentPath::new("Customers", id))
        .with("name", "Anna")
        .with("status", "active")
        .with("balance", 12.5)
        .with("tags", Value::List(vec!["vip".into()]))
}

fn order_doc(customer: &DocumentPath, id: &str, total: f64) -> Document {
    Document::new(customer.child("Orders", id))
        .with("total", total)
        .with(
            "customerRef",
            Value::Reference(customer.clone()),
        )
}

#[test]
fn default_then_set_strategy_fills_every_property() {
    let pool = DocumentPool::new();
    let customer: Customer = deserialize(&customer_doc("c1"), &pool, false).unwrap();

    // Primary key comes from the path, not a field.
    assert_eq!(customer.id, "c1");
    assert_eq!(customer.name, "Anna");
    assert_eq!(customer.balance, 12.5);
    assert_eq!(customer.tags, vec!["vip".to_string()]);
}

#[test]
fn enum_fields_parse_case_insensitively() {
    let pool = DocumentPool::new();
    let customer: Customer = deserialize(&customer_doc("c1"), &pool, false).unwrap();
    assert_eq!(customer.status, CustomerStatus::Active);

    let bad = customer_doc("c2").with("status", "archived");
    let err = deserialize::<Customer>(&bad, &pool, false).unwrap_err();
    assert!(matches!(
        err,
        DeserializeError::Document { source, .. }
            if matches!(*source, DeserializeError::UnknownEnumVariant { .. })
    ));
}

#[test]
fn full_constructor_strategy_uses_the_declared_ctor() {
    let parent = DocumentPath::new("Customers", "c1");
    let doc = order_doc(&parent, "o1", 99.0);

    let order: Order = deserialize(&doc, &DocumentPool::new(), true).unwrap();
    assert_eq!(order.id, "o1");
    assert_eq!(order.total, 99.0);
    assert!(order.placed.is_none());
}

#[test]
fn absent_nullable_fields_reach_the_constructor_as_nulls() {
    // Writes omit null fields, so an order with no placed timestamp
    // round-trips through a document that does not carry the field.
    let order = Order {
        id: "o1".into(),
        total: 42.0,
        placed: None,
        customer: DocRef::empty(),
    };
    let doc = to_document(&order).unwrap();
    assert!(doc.get("placed").is_none());

    let back: Order = deserialize(&doc, &DocumentPool::new(), true).unwrap();
    assert_eq!(back.total, 42.0);
    assert!(back.placed.is_none());
}

#[test]
fn partial_constructor_strategy_sets_the_remainder() {
    let doc = Document::new(DocumentPath::new("Products", "p1"))
        .with("name", "Widget")
        .with("category", "Tools")
        .with("price", Value::Int(5));

    let product: Product = deserialize(&doc, &DocumentPool::new(), false).unwrap();
    assert_eq!(product.name, "Widget");
    assert_eq!(product.category, "Tools");
    // Integer payloads widen into double-declared properties.
    assert_eq!(product.price, 5.0);
}

#[test]
fn type_mismatches_carry_the_document_path() {
    let doc = Document::new(DocumentPath::new("Products", "p1"))
        .with("name", "Widget")
        .with("price", "costly");

    let err = deserialize::<Product>(&doc, &DocumentPool::new(), false).unwrap_err();
    assert!(err.to_string().contains("Products/p1"));
}

#[test]
fn eager_references_resolve_from_the_pool() {
    let parent = DocumentPath::new("Customers", "c1");
    let mut pool = DocumentPool::new();
    pool.insert(customer_doc("c1"));

    let order: Order = deserialize(&order_doc(&parent, "o1", 10.0), &pool, false).unwrap();

    assert!(order.customer.is_resolved());
    assert_eq!(order.customer.get().unwrap().name, "Anna");
    assert_eq!(order.customer.path(), Some(&parent));
}

#[test]
fn lazy_references_stay_unresolved_handles() {
    let parent = DocumentPath::new("Customers", "c1");
    let mut pool = DocumentPool::new();
    pool.insert(customer_doc("c1"));

    let order: Order = deserialize(&order_doc(&parent, "o1", 10.0), &pool, true).unwrap();

    assert!(!order.customer.is_resolved());
    assert_eq!(order.customer.path(), Some(&parent));
}

#[test]
fn collection_navigations_assemble_from_pooled_children() {
    let parent = DocumentPath::new("Customers", "c1");
    let mut pool = DocumentPool::new();
    pool.insert(order_doc(&parent, "o1", 10.0));
    pool.insert(order_doc(&parent, "o2", 20.0));
    // Another customer's order must not leak in.
    pool.insert(order_doc(&DocumentPath::new("Customers", "c2"), "o9", 1.0));

    let customer: Customer = deserialize(&customer_doc("c1"), &pool, false).unwrap();

    let ids: Vec<&str> = customer.orders.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["o1", "o2"]);
    // Children defer their back-reference instead of recursing.
    assert!(!customer.orders[0].customer.is_resolved());
}

#[test]
fn projection_rows_cut_fields_and_sub_resources() {
    let parent = DocumentPath::new("Customers", "c1");
    let roots = vec![customer_doc("c1")];

    let mut pool = DocumentPool::new();
    pool.insert(order_doc(&parent, "o1", 10.0));
    pool.insert(order_doc(&parent, "o2", 250.0));
    pool.insert(order_doc(&parent, "o3", 120.0));

    let projection = ResolvedProjection {
        kind: ProjectionKind::Struct,
        fields: vec![ProjectedField {
            source: "name".into(),
            name: "Name".into(),
            slot: -1,
        }],
        sub_resources: vec![ResolvedSubResource {
            navigation: "Orders".into(),
            target_collection: "Orders",
            filters: vec![ResolvedFilter {
                field: "total".into(),
                op: FilterOp::Gte,
                value: Value::Double(100.0),
            }],
            order: vec![OrderClause {
                field: "total".into(),
                direction: OrderDirection::Desc,
            }],
            limit: Some(1),
            fields: vec![ProjectedField {
                source: "total".into(),
                name: "Total".into(),
                slot: -1,
            }],
            aggregation: None,
            result_name: "TopOrders".into(),
            slot: -1,
            nested: vec![],
        }],
    };

    let rows = materialize_rows(&projection, &roots, &pool, &BTreeMap::new());

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("Name"), Value::Text("Anna".into()));

    let Value::List(top) = rows[0].get("TopOrders") else {
        panic!("expected a list of child rows");
    };
    assert_eq!(top.len(), 1);
    let Value::Map(entries) = &top[0] else {
        panic!("expected a shaped child row");
    };
    assert_eq!(entries.get("Total"), Some(&Value::Double(250.0)));
}

#[test]
fn record_rows_order_values_by_constructor_slot() {
    use crate::query::plan::{AggregateKind, ScalarKind, SubAggregation, aggregation_key};

    let roots = vec![customer_doc("c1")];
    let pool = DocumentPool::new();

    let mut aggregations = BTreeMap::new();
    aggregations.insert(aggregation_key("Customers/c1", "OrderCount"), Value::Int(3));

    // Members deliberately declared out of slot order; positional
    // invocation depends on `slots` reordering them.
    let projection = ResolvedProjection {
        kind: ProjectionKind::Record,
        fields: vec![
            ProjectedField {
                source: "balance".into(),
                name: "Balance".into(),
                slot: 2,
            },
            ProjectedField {
                source: "name".into(),
                name: "Name".into(),
                slot: 0,
            },
        ],
        sub_resources: vec![ResolvedSubResource {
            navigation: "Orders".into(),
            target_collection: "Orders",
            filters: vec![],
            order: vec![],
            limit: None,
            fields: vec![],
            aggregation: Some(SubAggregation {
                kind: AggregateKind::Count,
                field: None,
                result: ScalarKind::Int,
            }),
            result_name: "OrderCount".into(),
            slot: 1,
            nested: vec![],
        }],
    };

    let rows = materialize_rows(&projection, &roots, &pool, &aggregations);

    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].slots,
        vec![
            Value::Text("Anna".into()),
            Value::Int(3),
            Value::Double(12.5),
        ]
    );
    // Named lookup still works alongside the positional view.
    assert_eq!(rows[0].get("Name"), Value::Text("Anna".into()));
}

#[test]
fn sub_resource_aggregations_look_up_by_parent_key() {
    use crate::query::plan::{aggregation_key, AggregateKind, ScalarKind, SubAggregation};

    let roots = vec![customer_doc("c1")];
    let pool = DocumentPool::new();

    let mut aggregations = BTreeMap::new();
    aggregations.insert(
        aggregation_key("Customers/c1", "OrderCount"),
        Value::Int(7),
    );

    let projection = ResolvedProjection {
        kind: ProjectionKind::Struct,
        fields: vec![],
        sub_resources: vec![ResolvedSubResource {
            navigation: "Orders".into(),
            target_collection: "Orders",
            filters: vec![],
            order: vec![],
            limit: None,
            fields: vec![],
            aggregation: Some(SubAggregation {
                kind: AggregateKind::Count,
                field: None,
                result: ScalarKind::Int,
            }),
            result_name: "OrderCount".into(),
            slot: -1,
            nested: vec![],
        }],
    };

    let rows = materialize_rows(&projection, &roots, &pool, &aggregations);
    assert_eq!(rows[0].get("OrderCount"), Value::Int(7));
}
