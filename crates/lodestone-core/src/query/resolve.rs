use crate::{
    context::ExecutionContext,
    document::Document,
    expr::{BindError, ValueExpr},
    path::{DocumentPath, PathError},
    query::plan::{
        AggregationSpec, CursorSpec, FilterClause, FilterOp, IncludeSpec, OrderClause,
        ProjectedField, ProjectionKind, ProjectionSpec, QueryPlan, SubAggregation,
        SubResourceProjection,
    },
    value::Value,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// ResolvedQuery
///
/// A plan with every deferred expression bound: filter operands are
/// plain values, page sizes are counts, enum operands are validated
/// against their variant tables, and reference operands are document
/// paths. This is the form the store adapter and the downstream
/// handlers consume.
///

#[derive(Clone, Debug)]
pub struct ResolvedQuery {
    pub collection: &'static str,

    /// Single-document fetch this query collapses to, when it does.
    pub lookup: Option<DocumentPath>,

    pub filters: Vec<ResolvedFilter>,
    pub or_groups: Vec<Vec<ResolvedFilter>>,
    pub order: Vec<OrderClause>,

    pub limit: Option<usize>,
    pub limit_to_last: Option<usize>,
    pub offset: Option<usize>,
    pub start_cursor: Option<ResolvedCursor>,

    pub includes: Vec<IncludeSpec>,
    pub aggregation: Option<AggregationSpec>,
    pub projection: Option<ResolvedProjection>,
}

impl ResolvedQuery {
    /// True when execution should be a direct document fetch instead
    /// of a collection query: a single equality on the primary key
    /// with nothing else narrowing or reshaping the result set.
    #[must_use]
    pub fn is_point_lookup(&self) -> bool {
        self.lookup.is_some()
    }

    /// One-line description for query logging.
    #[must_use]
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ResolvedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(lookup) = &self.lookup {
            return write!(f, "get {lookup}");
        }
        write!(f, "query {}", self.collection)?;
        for filter in &self.filters {
            write!(f, " where {filter}")?;
        }
        for group in &self.or_groups {
            write!(f, " where (")?;
            for (i, filter) in group.iter().enumerate() {
                if i > 0 {
                    write!(f, " or ")?;
                }
                write!(f, "{filter}")?;
            }
            write!(f, ")")?;
        }
        for order in &self.order {
            write!(f, " order {order}")?;
        }
        if let Some(n) = self.limit {
            write!(f, " limit {n}")?;
        }
        if let Some(n) = self.limit_to_last {
            write!(f, " limit_to_last {n}")?;
        }
        if let Some(n) = self.offset {
            write!(f, " offset {n}")?;
        }
        if let Some(agg) = &self.aggregation {
            write!(f, " aggregate {agg}")?;
        }
        Ok(())
    }
}

///
/// ResolvedFilter
///

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl ResolvedFilter {
    /// Evaluate the filter against one document, with the store's
    /// comparison semantics: equality is same-kind sameness, range
    /// comparisons never match across kinds, membership tests walk
    /// list operands.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        let actual = doc.get_or_null(&self.field);

        match self.op {
            FilterOp::Eq => actual.same(&self.value),
            FilterOp::Ne => !actual.same(&self.value),

            FilterOp::Lt | FilterOp::Lte | FilterOp::Gt | FilterOp::Gte => {
                if actual.kind_rank() != self.value.kind_rank() {
                    return false;
                }
                let ord = actual.compare(&self.value);
                match self.op {
                    FilterOp::Lt => ord == std::cmp::Ordering::Less,
                    FilterOp::Lte => ord != std::cmp::Ordering::Greater,
                    FilterOp::Gt => ord == std::cmp::Ordering::Greater,
                    FilterOp::Gte => ord != std::cmp::Ordering::Less,
                    _ => unreachable!(),
                }
            }

            FilterOp::ArrayContains => actual
                .as_list()
                .is_some_and(|items| items.iter().any(|item| item.same(&self.value))),

            FilterOp::In => self
                .value
                .as_list()
                .is_some_and(|options| options.iter().any(|option| actual.same(option))),

            FilterOp::ArrayContainsAny => match (actual.as_list(), self.value.as_list()) {
                (Some(items), Some(options)) => items
                    .iter()
                    .any(|item| options.iter().any(|option| item.same(option))),
                _ => false,
            },

            FilterOp::NotIn => self
                .value
                .as_list()
                .is_some_and(|options| !options.iter().any(|option| actual.same(option))),
        }
    }
}

impl fmt::Display for ResolvedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.value)
    }
}

/// Clause-list ordering over documents, with the document path as the
/// implicit final tiebreaker so result order is always deterministic.
#[must_use]
pub fn compare_documents(a: &Document, b: &Document, order: &[OrderClause]) -> std::cmp::Ordering {
    use crate::query::plan::OrderDirection;

    for clause in order {
        let ord = a
            .get_or_null(&clause.field)
            .compare(&b.get_or_null(&clause.field));
        let ord = match clause.direction {
            OrderDirection::Asc => ord,
            OrderDirection::Desc => ord.reverse(),
        };
        if ord != std::cmp::Ordering::Equal {
            return ord;
        }
    }

    a.path.to_string().cmp(&b.path.to_string())
}

///
/// ResolvedCursor
///

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedCursor {
    pub values: Vec<Value>,
    pub inclusive: bool,
}

///
/// ResolvedProjection / ResolvedSubResource
///

#[derive(Clone, Debug)]
pub struct ResolvedProjection {
    pub kind: ProjectionKind,
    pub fields: Vec<ProjectedField>,
    pub sub_resources: Vec<ResolvedSubResource>,
}

#[derive(Clone, Debug)]
pub struct ResolvedSubResource {
    pub navigation: String,
    pub target_collection: &'static str,

    pub filters: Vec<ResolvedFilter>,
    pub order: Vec<OrderClause>,
    pub limit: Option<usize>,

    pub fields: Vec<ProjectedField>,
    pub aggregation: Option<SubAggregation>,
    pub result_name: String,
    pub slot: i32,
    pub nested: Vec<ResolvedSubResource>,
}

///
/// ResolveError
///

#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum ResolveError {
    #[error(transparent)]
    Bind(#[from] BindError),

    #[error("{operator} bound to an invalid count: {found}")]
    InvalidPage {
        operator: &'static str,
        found: String,
    },

    #[error("filter on '{field}' expects a document reference, found {found}")]
    InvalidReferenceValue { field: String, found: String },

    #[error("'{value}' is not a variant of the enum behind '{field}'")]
    UnknownEnumVariant { field: String, value: String },

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Bind every deferred expression on the plan against the execution
/// context and detect the point-lookup shape.
pub fn resolve(plan: &QueryPlan, ctx: &ExecutionContext) -> Result<ResolvedQuery, ResolveError> {
    let filters = plan
        .filters()
        .iter()
        .map(|clause| resolve_clause(clause, ctx))
        .collect::<Result<Vec<_>, _>>()?;

    let or_groups = plan
        .or_groups()
        .iter()
        .map(|group| {
            group
                .clauses
                .iter()
                .map(|clause| resolve_clause(clause, ctx))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    let limit = resolve_count(plan.pagination().limit.as_ref(), "take", ctx)?;
    let limit_to_last = resolve_count(plan.pagination().limit_to_last.as_ref(), "take_last", ctx)?;
    let offset = resolve_count(plan.pagination().offset.as_ref(), "skip", ctx)?;

    let start_cursor = plan
        .start_cursor()
        .map(|cursor| resolve_cursor(cursor, ctx))
        .transpose()?;

    let projection = plan
        .projection()
        .map(|spec| resolve_projection(spec, ctx))
        .transpose()?;

    let mut resolved = ResolvedQuery {
        collection: plan.model().collection,
        lookup: None,
        filters,
        or_groups,
        order: plan.order().to_vec(),
        limit,
        limit_to_last,
        offset,
        start_cursor,
        includes: plan.includes().to_vec(),
        aggregation: plan.aggregation().cloned(),
        projection,
    };

    resolved.lookup = detect_point_lookup(plan, &resolved);

    Ok(resolved)
}

/// The point-lookup shape: exactly one equality filter on the primary
/// key field, and nothing else that narrows, pages, or reshapes.
/// Includes do not disqualify; they load alongside a direct fetch.
/// A zero limit does: it must return an empty set, not the document.
fn detect_point_lookup(plan: &QueryPlan, resolved: &ResolvedQuery) -> Option<DocumentPath> {
    if resolved.filters.len() != 1
        || !resolved.or_groups.is_empty()
        || resolved.offset.is_some()
        || resolved.limit_to_last.is_some()
        || resolved.start_cursor.is_some()
        || resolved.aggregation.is_some()
        || resolved.projection.is_some()
        || resolved.limit == Some(0)
    {
        return None;
    }

    let filter = &resolved.filters[0];
    let model = plan.model();
    if filter.op != FilterOp::Eq || filter.field != model.field_of(model.primary_key) {
        return None;
    }

    match &filter.value {
        Value::Text(id) => Some(DocumentPath::new(model.collection, id)),
        Value::Reference(path) => Some(path.clone()),
        _ => None,
    }
}

fn resolve_clause(
    clause: &FilterClause,
    ctx: &ExecutionContext,
) -> Result<ResolvedFilter, ResolveError> {
    let mut value = clause.value.eval(ctx)?;

    if let Some(variants) = clause.enum_origin {
        value = convert_enum(&clause.field, variants, value)?;
    }
    if let Some(collection) = clause.reference_collection {
        value = convert_reference(&clause.field, collection, value)?;
    }

    Ok(ResolvedFilter {
        field: clause.field.clone(),
        op: clause.op,
        value,
    })
}

/// Validate an enum operand against the variant table and rewrite it
/// to the canonical variant name in store form (text). Membership
/// operands convert element-wise.
fn convert_enum(
    field: &str,
    variants: &'static [&'static str],
    value: Value,
) -> Result<Value, ResolveError> {
    match value {
        Value::Text(s) | Value::Enum(s) => variants
            .iter()
            .find(|v| v.eq_ignore_ascii_case(&s))
            .map(|v| Value::Text((*v).to_string()))
            .ok_or_else(|| ResolveError::UnknownEnumVariant {
                field: field.to_string(),
                value: s,
            }),

        Value::List(items) => items
            .into_iter()
            .map(|item| convert_enum(field, variants, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),

        other => Err(ResolveError::UnknownEnumVariant {
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}

/// Rewrite a reference operand to a document path: bare ids land in
/// the navigation's target collection, slash paths parse as-is.
fn convert_reference(
    field: &str,
    collection: &'static str,
    value: Value,
) -> Result<Value, ResolveError> {
    match value {
        Value::Reference(_) => Ok(value),

        Value::Text(s) if s.contains('/') => Ok(Value::Reference(DocumentPath::parse(&s)?)),
        Value::Text(s) => Ok(Value::Reference(DocumentPath::new(collection, s))),

        Value::List(items) => items
            .into_iter()
            .map(|item| convert_reference(field, collection, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),

        other => Err(ResolveError::InvalidReferenceValue {
            field: field.to_string(),
            found: other.to_string(),
        }),
    }
}

fn resolve_count(
    expr: Option<&ValueExpr>,
    operator: &'static str,
    ctx: &ExecutionContext,
) -> Result<Option<usize>, ResolveError> {
    let Some(expr) = expr else { return Ok(None) };

    match expr.eval(ctx)? {
        Value::Int(n) if n >= 0 => {
            // Counts beyond usize cannot occur on supported targets.
            #[allow(clippy::cast_sign_loss)]
            Ok(Some(n as usize))
        }
        other => Err(ResolveError::InvalidPage {
            operator,
            found: other.to_string(),
        }),
    }
}

fn resolve_cursor(
    cursor: &CursorSpec,
    ctx: &ExecutionContext,
) -> Result<ResolvedCursor, ResolveError> {
    let values = cursor
        .values
        .iter()
        .map(|expr| expr.eval(ctx))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ResolvedCursor {
        values,
        inclusive: cursor.inclusive,
    })
}

fn resolve_projection(
    spec: &ProjectionSpec,
    ctx: &ExecutionContext,
) -> Result<ResolvedProjection, ResolveError> {
    Ok(ResolvedProjection {
        kind: spec.kind,
        fields: spec.fields.clone(),
        sub_resources: spec
            .sub_resources
            .iter()
            .map(|sub| resolve_sub_resource(sub, ctx))
            .collect::<Result<Vec<_>, _>>()?,
    })
}

fn resolve_sub_resource(
    sub: &SubResourceProjection,
    ctx: &ExecutionContext,
) -> Result<ResolvedSubResource, ResolveError> {
    Ok(ResolvedSubResource {
        navigation: sub.navigation.clone(),
        target_collection: sub.target_collection,
        filters: sub
            .filters
            .iter()
            .map(|clause| resolve_clause(clause, ctx))
            .collect::<Result<Vec<_>, _>>()?,
        order: sub.order.clone(),
        limit: resolve_count(sub.limit.as_ref(), "take", ctx)?,
        fields: sub.fields.clone(),
        aggregation: sub.aggregation.clone(),
        result_name: sub.result_name.clone(),
        slot: sub.slot,
        nested: sub
            .nested
            .iter()
            .map(|nested| resolve_sub_resource(nested, ctx))
            .collect::<Result<Vec<_>, _>>()?,
    })
}
