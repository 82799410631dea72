use crate::{
    expr::ValueExpr,
    query::plan::{AggregateKind, OrderDirection, ScalarKind},
    value::Value,
};
use std::fmt;

///
/// QueryOp
///
/// Tagged operator algebra handed to the translators: the provider's
/// rendition of a host framework's compiled query-operator chain.
/// Each variant carries the operator-specific expression data its
/// translator pattern-matches on; translators are total over these
/// shapes and answer "not translatable" rather than panicking.
///

#[derive(Clone, Debug)]
pub enum QueryOp {
    Filter(FilterExpr),
    OrderBy {
        property: String,
        direction: OrderDirection,
    },
    ThenBy {
        property: String,
        direction: OrderDirection,
    },
    Skip(ValueExpr),
    Take(ValueExpr),
    TakeLast(ValueExpr),
    StartAt {
        values: Vec<ValueExpr>,
        inclusive: bool,
    },
    /// Ordinary eager-load of a configured navigation.
    Include {
        navigation: String,
    },
    /// Inner-join shape; recognized navigation joins become includes.
    Join(JoinOp),
    Select(SelectExpr),
    Aggregate(AggregateOp),
}

impl fmt::Display for QueryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Filter(_) => "filter",
            Self::OrderBy { .. } => "order_by",
            Self::ThenBy { .. } => "then_by",
            Self::Skip(_) => "skip",
            Self::Take(_) => "take",
            Self::TakeLast(_) => "take_last",
            Self::StartAt { .. } => "start_at",
            Self::Include { .. } => "include",
            Self::Join(_) => "join",
            Self::Select(_) => "select",
            Self::Aggregate(op) => return write!(f, "{}", op.kind),
        };
        write!(f, "{label}")
    }
}

///
/// FilterExpr
///
/// Host-side boolean expression over entity properties. Property
/// names are host names (or dotted nested paths); the filter
/// translator maps them onto store fields through the entity model.
///

#[derive(Clone, Debug, PartialEq)]
pub enum FilterExpr {
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare {
        property: String,
        op: CompareOp,
        value: ValueExpr,
    },
    /// String-prefix match; rewritten to a two-sided range.
    StartsWith {
        property: String,
        value: ValueExpr,
    },
}

impl FilterExpr {
    fn compare(property: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            property: property.into(),
            op,
            value: ValueExpr::Constant(value.into()),
        }
    }

    #[must_use]
    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Eq, value)
    }

    #[must_use]
    pub fn ne(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Ne, value)
    }

    #[must_use]
    pub fn lt(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Lt, value)
    }

    #[must_use]
    pub fn lte(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Lte, value)
    }

    #[must_use]
    pub fn gt(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Gt, value)
    }

    #[must_use]
    pub fn gte(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Gte, value)
    }

    #[must_use]
    pub fn starts_with(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::StartsWith {
            property: property.into(),
            value: ValueExpr::Constant(value.into()),
        }
    }

    #[must_use]
    pub fn contains(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Contains, value)
    }

    #[must_use]
    pub fn in_list(
        property: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        Self::compare(
            property,
            CompareOp::In,
            Value::List(values.into_iter().map(Into::into).collect()),
        )
    }

    #[must_use]
    pub fn not_in(
        property: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        Self::compare(
            property,
            CompareOp::NotIn,
            Value::List(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Comparison against a deferred expression instead of a literal.
    #[must_use]
    pub fn compare_expr(property: impl Into<String>, op: CompareOp, value: ValueExpr) -> Self {
        Self::Compare {
            property: property.into(),
            op,
            value,
        }
    }

    #[must_use]
    pub fn and(exprs: Vec<Self>) -> Self {
        Self::And(exprs)
    }

    #[must_use]
    pub fn or(exprs: Vec<Self>) -> Self {
        Self::Or(exprs)
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Self) -> Self {
        Self::Not(Box::new(expr))
    }
}

///
/// CompareOp
///
/// Host-side comparison operators, before rewrite to the store's
/// native operator set.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Membership test on a collection-typed property.
    Contains,
    /// Membership of the property value in a given list.
    In,
    /// Any-overlap between a collection-typed property and a list.
    ContainsAny,
    NotIn,
}

///
/// JoinOp
///
/// Inner-join operator shape as the host framework emits it for a
/// required navigation eager-load: two shaped sources and a key
/// selector each. The join translator recovers the navigation from
/// the outer key selector.
///

#[derive(Clone, Debug)]
pub struct JoinOp {
    /// Collection or entity name of the inner source, diagnostics only.
    pub inner_source: String,
    pub outer_key: KeySelector,
    pub inner_key: KeySelector,
}

///
/// KeySelector
///
/// What a join key selector was observed to access.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeySelector {
    /// Selector names a configured navigation.
    Navigation(String),
    /// Selector names a plain property.
    Property(String),
    /// Selector shape could not be decoded.
    Opaque(String),
}

///
/// SelectExpr
///
/// Result-construction expression for projections.
///

#[derive(Clone, Debug)]
pub enum SelectExpr {
    /// Identity projection: the entity itself.
    Identity,

    /// Single member access, possibly dotted.
    Field(String),

    /// Composite construction from named bindings.
    Composite {
        kind: CompositeKind,
        bindings: Vec<SelectBinding>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompositeKind {
    /// Anonymous/struct shape.
    Anonymous,
    /// Named type populated via setters.
    Settable,
    /// Named type constructed positionally.
    Record,
}

///
/// SelectBinding
///

#[derive(Clone, Debug)]
pub struct SelectBinding {
    /// Result member name.
    pub name: String,

    /// Constructor slot for record shapes; `None` when set by name.
    pub slot: Option<usize>,

    pub source: SelectSource,
}

///
/// SelectSource
///

#[derive(Clone, Debug)]
pub enum SelectSource {
    /// Member access on the root entity (dotted for nested objects).
    Property(String),

    /// Query over an included navigation.
    SubQuery(SubQuery),
}

///
/// SubQuery
///
/// Shaped query over a navigation inside a projection, discovered by
/// walking the select expression.
///

#[derive(Clone, Debug)]
pub struct SubQuery {
    pub navigation: String,
    pub filter: Option<FilterExpr>,
    pub order: Vec<(String, OrderDirection)>,
    pub limit: Option<ValueExpr>,

    /// Projected child members; empty selects whole children.
    pub bindings: Vec<SelectBinding>,

    /// Terminal aggregation (`count()`, `sum(x)`, ...) instead of rows.
    pub aggregate: Option<(AggregateKind, Option<String>, ScalarKind)>,
}

///
/// AggregateOp
///

#[derive(Clone, Debug)]
pub struct AggregateOp {
    pub kind: AggregateKind,

    /// Target property, when the aggregate takes one.
    pub property: Option<String>,

    /// Declared result shape.
    pub result: ScalarKind,
}
