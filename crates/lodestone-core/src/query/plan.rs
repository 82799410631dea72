use crate::{expr::ValueExpr, model::EntityModel};
use std::fmt;
use thiserror::Error as ThisError;

///
/// QueryPlan
///
/// The provider's query AST: everything the translators can express
/// about one query against one root collection.
///
/// A plan is built incrementally by the operator translators during a
/// single compilation pass and is immutable once handed to the
/// pipeline (the pipeline only ever holds it behind `Arc`). Structural
/// invariants are enforced at mutation time:
///
/// - aggregation and projection are mutually exclusive
/// - at most one include per navigation name
///

#[derive(Debug)]
pub struct QueryPlan {
    model: &'static EntityModel,
    filters: Vec<FilterClause>,
    or_groups: Vec<OrFilterGroup>,
    order: Vec<OrderClause>,
    pagination: Pagination,
    start_cursor: Option<CursorSpec>,
    includes: Vec<IncludeSpec>,
    aggregation: Option<AggregationSpec>,
    projection: Option<ProjectionSpec>,
}

impl QueryPlan {
    #[must_use]
    pub fn new(model: &'static EntityModel) -> Self {
        Self {
            model,
            filters: Vec::new(),
            or_groups: Vec::new(),
            order: Vec::new(),
            pagination: Pagination::default(),
            start_cursor: None,
            includes: Vec::new(),
            aggregation: None,
            projection: None,
        }
    }

    #[must_use]
    pub const fn model(&self) -> &'static EntityModel {
        self.model
    }

    #[must_use]
    pub fn filters(&self) -> &[FilterClause] {
        &self.filters
    }

    #[must_use]
    pub fn or_groups(&self) -> &[OrFilterGroup] {
        &self.or_groups
    }

    #[must_use]
    pub fn order(&self) -> &[OrderClause] {
        &self.order
    }

    #[must_use]
    pub const fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    #[must_use]
    pub const fn start_cursor(&self) -> Option<&CursorSpec> {
        self.start_cursor.as_ref()
    }

    #[must_use]
    pub fn includes(&self) -> &[IncludeSpec] {
        &self.includes
    }

    #[must_use]
    pub const fn aggregation(&self) -> Option<&AggregationSpec> {
        self.aggregation.as_ref()
    }

    #[must_use]
    pub const fn projection(&self) -> Option<&ProjectionSpec> {
        self.projection.as_ref()
    }

    //
    // Mutators, crate-internal: only the translators build plans.
    //

    pub(crate) fn push_filter(&mut self, clause: FilterClause) {
        self.filters.push(clause);
    }

    pub(crate) fn push_or_group(&mut self, group: OrFilterGroup) {
        self.or_groups.push(group);
    }

    /// Primary ordering: replaces any existing order clauses.
    pub(crate) fn replace_order(&mut self, clause: OrderClause) {
        self.order.clear();
        self.order.push(clause);
    }

    /// Secondary ordering: appends without touching prior clauses.
    pub(crate) fn append_order(&mut self, clause: OrderClause) {
        self.order.push(clause);
    }

    pub(crate) fn set_limit(&mut self, expr: ValueExpr) {
        self.pagination.limit = Some(expr);
        self.pagination.limit_to_last = None;
    }

    pub(crate) fn set_limit_to_last(&mut self, expr: ValueExpr) {
        self.pagination.limit_to_last = Some(expr);
        self.pagination.limit = None;
    }

    pub(crate) fn set_offset(&mut self, expr: ValueExpr) {
        self.pagination.offset = Some(expr);
    }

    pub(crate) fn set_cursor(&mut self, cursor: CursorSpec) {
        self.start_cursor = Some(cursor);
    }

    /// Register an include, de-duplicating by navigation name.
    pub(crate) fn add_include(&mut self, include: IncludeSpec) {
        if !self.includes.iter().any(|i| i.navigation == include.navigation) {
            self.includes.push(include);
        }
    }

    pub(crate) fn set_aggregation(&mut self, spec: AggregationSpec) -> Result<(), PlanViolation> {
        if self.projection.is_some() {
            return Err(PlanViolation::AggregationWithProjection);
        }
        self.aggregation = Some(spec);
        Ok(())
    }

    pub(crate) fn set_projection(&mut self, spec: ProjectionSpec) -> Result<(), PlanViolation> {
        if self.aggregation.is_some() {
            return Err(PlanViolation::ProjectionWithAggregation);
        }
        self.projection = Some(spec);
        Ok(())
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plan[{}]", self.model.collection)?;
        for clause in &self.filters {
            write!(f, " where {clause}")?;
        }
        for group in &self.or_groups {
            write!(f, " where ({group})")?;
        }
        for order in &self.order {
            write!(f, " order {order}")?;
        }
        if let Some(limit) = &self.pagination.limit {
            write!(f, " limit {limit}")?;
        }
        if let Some(limit) = &self.pagination.limit_to_last {
            write!(f, " limit_to_last {limit}")?;
        }
        if let Some(offset) = &self.pagination.offset {
            write!(f, " offset {offset}")?;
        }
        for include in &self.includes {
            write!(f, " include {}", include.navigation)?;
        }
        if let Some(agg) = &self.aggregation {
            write!(f, " aggregate {agg}")?;
        }
        if self.projection.is_some() {
            write!(f, " select <projection>")?;
        }
        Ok(())
    }
}

///
/// PlanViolation
///
/// Structural invariant breaches surfaced by plan mutators. Reaching
/// one means a translator produced an unrepresentable combination.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, ThisError)]
pub enum PlanViolation {
    #[error("an aggregation cannot be added to a plan that already projects")]
    AggregationWithProjection,

    #[error("a projection cannot be added to a plan that already aggregates")]
    ProjectionWithAggregation,
}

///
/// FilterOp
///
/// Native comparison operators of the target store. String-prefix and
/// substring shapes do not exist here; the filter translator rewrites
/// them into ranges before a clause is formed.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    ArrayContains,
    In,
    ArrayContainsAny,
    NotIn,
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::ArrayContains => "array-contains",
            Self::In => "in",
            Self::ArrayContainsAny => "array-contains-any",
            Self::NotIn => "not-in",
        };
        write!(f, "{label}")
    }
}

///
/// FilterClause
///

#[derive(Clone, Debug, PartialEq)]
pub struct FilterClause {
    /// Store field path (dotted for nested objects).
    pub field: String,

    pub op: FilterOp,

    /// Deferred operand; evaluated at resolution time.
    pub value: ValueExpr,

    /// Variant table of the originating host enum, when the property
    /// is enum-declared. The resolver rewrites the operand to text and
    /// validates it against this table.
    pub enum_origin: Option<&'static [&'static str]>,

    /// Target collection when the operand must become a document
    /// reference path rather than a literal.
    pub reference_collection: Option<&'static str>,
}

impl FilterClause {
    #[must_use]
    pub fn new(field: impl Into<String>, op: FilterOp, value: ValueExpr) -> Self {
        Self {
            field: field.into(),
            op,
            value,
            enum_origin: None,
            reference_collection: None,
        }
    }
}

impl fmt::Display for FilterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.value)
    }
}

///
/// OrFilterGroup
///
/// Disjunction of clauses, AND-combined with the rest of the plan.
///

#[derive(Clone, Debug, PartialEq)]
pub struct OrFilterGroup {
    pub clauses: Vec<FilterClause>,
}

impl fmt::Display for OrFilterGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                write!(f, " or ")?;
            }
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}

///
/// OrderDirection / OrderClause
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OrderClause {
    pub field: String,
    pub direction: OrderDirection,
}

impl fmt::Display for OrderClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            OrderDirection::Asc => "asc",
            OrderDirection::Desc => "desc",
        };
        write!(f, "{} {dir}", self.field)
    }
}

///
/// Pagination
///
/// Limit, limit-from-end, and offset, each deferred until resolution
/// so captured page sizes bind late.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pagination {
    pub limit: Option<ValueExpr>,
    pub limit_to_last: Option<ValueExpr>,
    pub offset: Option<ValueExpr>,
}

///
/// CursorSpec
///
/// Start boundary for cursor pagination: one deferred value per order
/// clause, inclusive (`start_at`) or exclusive (`start_after`).
///

#[derive(Clone, Debug, PartialEq)]
pub struct CursorSpec {
    pub values: Vec<ValueExpr>,
    pub inclusive: bool,
}

///
/// IncludeSpec
///

#[derive(Clone, Debug)]
pub struct IncludeSpec {
    pub navigation: String,
    pub is_collection: bool,
    pub target_collection: &'static str,
    pub target: &'static EntityModel,
}

///
/// AggregationSpec
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AggregateKind {
    Count,
    Any,
    Sum,
    Average,
    Min,
    Max,
}

impl fmt::Display for AggregateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Count => "count",
            Self::Any => "any",
            Self::Sum => "sum",
            Self::Average => "average",
            Self::Min => "min",
            Self::Max => "max",
        };
        write!(f, "{label}")
    }
}

/// Declared numeric/result shape of an aggregation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScalarKind {
    Bool,
    Int,
    Double,
    Decimal,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AggregationSpec {
    pub kind: AggregateKind,

    /// Target store field; `None` for count/any.
    pub field: Option<String>,

    pub result: ScalarKind,
}

impl fmt::Display for AggregationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}({field})", self.kind),
            None => write!(f, "{}()", self.kind),
        }
    }
}

///
/// ProjectionSpec
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProjectionKind {
    /// Whole entity; delegates to the deserializer.
    Entity,
    /// Single scalar field.
    SingleField,
    /// Anonymous/struct shape, assigned by name.
    Struct,
    /// Named result type with setters.
    Settable,
    /// Named result type with a positional constructor.
    Record,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectedField {
    /// Dotted source path on the root document.
    pub source: String,

    /// Result member name.
    pub name: String,

    /// Constructor slot for record kinds; -1 when assigned by name.
    pub slot: i32,
}

#[derive(Clone, Debug)]
pub struct ProjectionSpec {
    pub kind: ProjectionKind,
    pub fields: Vec<ProjectedField>,
    pub sub_resources: Vec<SubResourceProjection>,
}

///
/// SubResourceProjection
///
/// Nested projection over an included navigation: its own filters,
/// ordering, limit, projected fields or aggregation, recursively.
///

#[derive(Clone, Debug)]
pub struct SubResourceProjection {
    pub navigation: String,
    pub target_collection: &'static str,
    pub target: &'static EntityModel,

    pub filters: Vec<FilterClause>,
    pub order: Vec<OrderClause>,
    pub limit: Option<ValueExpr>,

    /// Projected child fields; empty means whole child objects.
    pub fields: Vec<ProjectedField>,

    /// Scalar aggregation instead of child objects.
    pub aggregation: Option<SubAggregation>,

    /// Result member name on the parent projection.
    pub result_name: String,

    /// Constructor slot on the parent projection; -1 when unslotted.
    pub slot: i32,

    pub nested: Vec<SubResourceProjection>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubAggregation {
    pub kind: AggregateKind,
    pub field: Option<String>,
    pub result: ScalarKind,
}

/// Aggregation-result key for a sub-resource value on a given root.
#[must_use]
pub fn aggregation_key(parent_path: &str, result_name: &str) -> String {
    format!("{parent_path}:{result_name}")
}
