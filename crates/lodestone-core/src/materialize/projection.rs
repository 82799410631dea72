use crate::{
    document::{Document, DocumentPool},
    path::DocumentPath,
    query::{
        plan::{aggregation_key, ProjectionKind},
        resolve::{compare_documents, ResolvedProjection, ResolvedSubResource},
    },
    value::Value,
};
use std::collections::BTreeMap;

///
/// ProjectionRow
///
/// One shaped result row: the root document's path plus the projected
/// member values by result name. Sub-resource members hold a list of
/// maps (child rows) or the looked-up aggregation scalar.
///
/// Record-kind rows additionally carry `slots`, the member values in
/// declared constructor slot order, so a record type can be invoked
/// positionally.
///

#[derive(Clone, Debug, PartialEq)]
pub struct ProjectionRow {
    pub path: DocumentPath,
    pub kind: ProjectionKind,
    pub values: BTreeMap<String, Value>,
    pub slots: Vec<Value>,
}

impl ProjectionRow {
    #[must_use]
    pub fn get(&self, name: &str) -> Value {
        self.values.get(name).cloned().unwrap_or(Value::Null)
    }
}

/// Shape result rows from the loaded documents.
///
/// Sub-resource rows are cut from the pool: the execution handler has
/// already fetched each root's children, so shaping is pure filtering,
/// ordering, and limiting over in-memory documents. Sub-resource
/// aggregations were computed store-side and arrive keyed by
/// `parent_path:result_name`.
#[must_use]
pub fn materialize_rows(
    projection: &ResolvedProjection,
    roots: &[Document],
    pool: &DocumentPool,
    aggregations: &BTreeMap<String, Value>,
) -> Vec<ProjectionRow> {
    roots
        .iter()
        .map(|root| ProjectionRow {
            path: root.path.clone(),
            kind: projection.kind,
            values: row_values(
                &projection.fields,
                &projection.sub_resources,
                root,
                pool,
                aggregations,
            ),
            slots: if projection.kind == ProjectionKind::Record {
                slot_values(
                    &projection.fields,
                    &projection.sub_resources,
                    root,
                    pool,
                    aggregations,
                )
            } else {
                Vec::new()
            },
        })
        .collect()
}

/// Member values in declared constructor slot order.
fn slot_values(
    fields: &[crate::query::plan::ProjectedField],
    sub_resources: &[ResolvedSubResource],
    doc: &Document,
    pool: &DocumentPool,
    aggregations: &BTreeMap<String, Value>,
) -> Vec<Value> {
    let mut entries: Vec<(i32, Value)> = fields
        .iter()
        .map(|field| (field.slot, doc.get_or_null(&field.source)))
        .collect();
    for sub in sub_resources {
        entries.push((sub.slot, sub_resource_value(sub, doc, pool, aggregations)));
    }

    entries.sort_by_key(|(slot, _)| *slot);
    entries.into_iter().map(|(_, value)| value).collect()
}

fn row_values(
    fields: &[crate::query::plan::ProjectedField],
    sub_resources: &[ResolvedSubResource],
    doc: &Document,
    pool: &DocumentPool,
    aggregations: &BTreeMap<String, Value>,
) -> BTreeMap<String, Value> {
    let mut values = BTreeMap::new();

    for field in fields {
        values.insert(field.name.clone(), doc.get_or_null(&field.source));
    }
    for sub in sub_resources {
        values.insert(
            sub.result_name.clone(),
            sub_resource_value(sub, doc, pool, aggregations),
        );
    }

    values
}

fn sub_resource_value(
    sub: &ResolvedSubResource,
    parent: &Document,
    pool: &DocumentPool,
    aggregations: &BTreeMap<String, Value>,
) -> Value {
    if sub.aggregation.is_some() {
        let key = aggregation_key(&parent.path.to_string(), &sub.result_name);
        return aggregations.get(&key).cloned().unwrap_or(Value::Null);
    }

    let mut children = pool.children_of(&parent.path, sub.target_collection);
    children.retain(|child| sub.filters.iter().all(|filter| filter.matches(child)));
    children.sort_by(|a, b| compare_documents(a, b, &sub.order));
    if let Some(limit) = sub.limit {
        children.truncate(limit);
    }

    let rows = children
        .into_iter()
        .map(|child| {
            // Empty field list selects the whole child object.
            let mut entries = if sub.fields.is_empty() {
                child.fields.clone()
            } else {
                row_values(&sub.fields, &[], child, pool, aggregations)
            };
            for nested in &sub.nested {
                entries.insert(
                    nested.result_name.clone(),
                    sub_resource_value(nested, child, pool, aggregations),
                );
            }
            Value::Map(entries)
        })
        .collect();

    Value::List(rows)
}
