mod common;

use common::{seeded_store, Product, Review};
use futures::TryStreamExt;
use lodestone::{
    core::{
        config::ProviderConfig,
        expr::ValueExpr,
        query::operator::{
            CompositeKind, FilterExpr, JoinOp, KeySelector, QueryOp, SelectBinding, SelectExpr,
            SelectSource, SubQuery,
        },
        query::plan::{AggregateKind, ScalarKind},
        store::memory::MemoryStore,
        store::{StoreError, StoreStatus},
        value::Value,
    },
    Error, ErrorKind, Session,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn filtered_ordered_limited_queries_come_back_in_order() {
    let session = Session::new(seeded_store());

    let products: Vec<Product> = session
        .load()
        .filter(FilterExpr::eq("Category", "Electronics"))
        .order_by_desc("Price")
        .take(10)
        .all()
        .await
        .unwrap();

    let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Laptop", "Headphones"]);
}

#[tokio::test]
async fn saved_entities_come_back_by_primary_key() {
    let session = Session::new(Arc::new(MemoryStore::new()));

    let product = Product {
        id: "p9".into(),
        name: "Keyboard".into(),
        category: "Electronics".into(),
        price: 89.0,
        reviews: vec![],
    };
    session.save(&product).await.unwrap();

    let loaded: Option<Product> = session.get("p9").await.unwrap();
    assert_eq!(loaded, Some(product));

    let missing: Option<Product> = session.get("nope").await.unwrap();
    assert_eq!(missing, None);

    session.delete_by_id::<Product>("p9").await.unwrap();
    let gone: Option<Product> = session.get("p9").await.unwrap();
    assert_eq!(gone, None);
}

#[tokio::test]
async fn unchanged_saves_skip_the_store() {
    let store = Arc::new(MemoryStore::new());
    let session = Session::new(store.clone());

    let mut product = Product {
        id: "p9".into(),
        name: "Keyboard".into(),
        category: "Electronics".into(),
        price: 89.0,
        reviews: vec![],
    };
    session.save(&product).await.unwrap();

    // Any commit from here on would fail.
    store.inject_failure(StoreError::new(StoreStatus::PermissionDenied, "sealed"));

    // Identical document: the tracked snapshot short-circuits the write.
    session.save(&product).await.unwrap();

    // Changed document: the write goes through and hits the failure.
    product.price = 79.0;
    let error = session.save(&product).await.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Store(StoreStatus::PermissionDenied));
}

#[tokio::test]
async fn take_zero_returns_nothing_even_by_primary_key() {
    let session = Session::new(seeded_store());

    let products: Vec<Product> = session
        .load()
        .filter(FilterExpr::eq("Id", "p1"))
        .take(0)
        .all()
        .await
        .unwrap();
    assert!(products.is_empty());
}

#[tokio::test]
async fn one_rejects_multiple_matches() {
    let session = Session::new(seeded_store());

    let error = session
        .load::<Product>()
        .filter(FilterExpr::eq("Category", "Electronics"))
        .one()
        .await
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::NotUnique);

    let novel: Option<Product> = session
        .load()
        .filter(FilterExpr::eq("Category", "Books"))
        .one()
        .await
        .unwrap();
    assert_eq!(novel.unwrap().name, "Novel");
}

#[tokio::test]
async fn aggregation_terminals_run_natively() {
    let session = Session::new(seeded_store());

    let count = session
        .load::<Product>()
        .filter(FilterExpr::eq("Category", "Electronics"))
        .count()
        .await
        .unwrap();
    assert_eq!(count, 2);

    let sum = session
        .load::<Product>()
        .filter(FilterExpr::eq("Category", "Electronics"))
        .sum("Price")
        .await
        .unwrap();
    assert_eq!(sum, Value::Double(1399.0));

    let any = session
        .load::<Product>()
        .filter(FilterExpr::eq("Category", "Toys"))
        .any()
        .await
        .unwrap();
    assert!(!any);
}

#[tokio::test]
async fn deferred_parameters_bind_at_execution() {
    let session = Session::new(seeded_store());

    let products: Vec<Product> = session
        .load()
        .order_by("Price")
        .take_expr(ValueExpr::param("page_size"))
        .param("page_size", 2i64)
        .all()
        .await
        .unwrap();
    assert_eq!(products.len(), 2);

    // The same query without the binding fails at resolution.
    let error = session
        .load::<Product>()
        .order_by("Price")
        .take_expr(ValueExpr::param("page_size"))
        .all()
        .await
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::Invalid);
}

#[tokio::test]
async fn includes_materialize_sub_resource_children() {
    let session = Session::new(seeded_store());

    let product: Option<Product> = session
        .load()
        .filter(FilterExpr::eq("Id", "p1"))
        .include("Reviews")
        .one()
        .await
        .unwrap();

    let reviews: Vec<Review> = product.unwrap().reviews;
    assert_eq!(reviews.len(), 2);
    assert_eq!(reviews[0].author, "Anna");
}

#[tokio::test]
async fn projections_shape_rows_with_sub_aggregates() {
    let session = Session::new(seeded_store());

    let select = SelectExpr::Composite {
        kind: CompositeKind::Anonymous,
        bindings: vec![
            SelectBinding {
                name: "Name".into(),
                slot: None,
                source: SelectSource::Property("Name".into()),
            },
            SelectBinding {
                name: "ReviewCount".into(),
                slot: None,
                source: SelectSource::SubQuery(SubQuery {
                    navigation: "Reviews".into(),
                    filter: None,
                    order: vec![],
                    limit: None,
                    bindings: vec![],
                    aggregate: Some((AggregateKind::Count, None, ScalarKind::Int)),
                }),
            },
        ],
    };

    let rows = session
        .load::<Product>()
        .filter(FilterExpr::eq("Category", "Electronics"))
        .order_by("Price")
        .select(select)
        .rows()
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("Name"), Value::Text("Headphones".into()));
    assert_eq!(rows[0].get("ReviewCount"), Value::Int(0));
    assert_eq!(rows[1].get("Name"), Value::Text("Laptop".into()));
    assert_eq!(rows[1].get("ReviewCount"), Value::Int(2));
}

#[tokio::test]
async fn streams_deliver_the_same_entities_lazily() {
    let session = Session::new(seeded_store());

    let stream = session
        .load::<Product>()
        .filter(FilterExpr::eq("Category", "Electronics"))
        .order_by("Price")
        .stream();

    let products: Vec<Product> = stream.try_collect().await.unwrap();
    assert_eq!(products.len(), 2);
    assert_eq!(products[0].name, "Headphones");
}

#[tokio::test]
async fn cancelled_sessions_refuse_writes() {
    let cancel = CancellationToken::new();
    let session = Session::new(Arc::new(MemoryStore::new())).with_cancel(cancel.clone());
    cancel.cancel();

    let error = session
        .save(&Product {
            id: "p9".into(),
            name: "Keyboard".into(),
            category: "Electronics".into(),
            price: 89.0,
            reviews: vec![],
        })
        .await
        .unwrap_err();
    assert_eq!(error.kind, ErrorKind::Store(StoreStatus::Cancelled));
}

#[tokio::test]
async fn transient_store_failures_retry_transparently() {
    let store = seeded_store();
    store.inject_failure(StoreError::new(StoreStatus::Unavailable, "flaky"));
    store.inject_failure(StoreError::new(StoreStatus::Unavailable, "flaky"));

    let session = Session::new(store).with_config(ProviderConfig {
        retry_initial_delay: std::time::Duration::from_millis(1),
        ..ProviderConfig::default()
    });

    let products: Vec<Product> = session
        .load()
        .filter(FilterExpr::eq("Category", "Books"))
        .all()
        .await
        .unwrap();
    assert_eq!(products.len(), 1);
}

#[tokio::test]
async fn untranslatable_operators_fail_with_the_operator_named() {
    let session = Session::new(seeded_store());

    let error: Error = session
        .load::<Product>()
        .op(QueryOp::Join(JoinOp {
            inner_source: "Warehouses".into(),
            outer_key: KeySelector::Opaque("w => w.Region".into()),
            inner_key: KeySelector::Property("Id".into()),
        }))
        .all()
        .await
        .unwrap_err();

    assert_eq!(error.kind, ErrorKind::Unsupported);
    assert!(error.message.contains("join"));
}
