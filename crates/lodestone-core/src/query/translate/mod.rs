//! Operator translators.
//!
//! One translator per supported query operator. Each is a pure
//! function from (prior plan, operator data) to either an updated plan
//! or an explicit "not translatable" signal; unsupported *shapes*
//! never panic and never error mid-translation. The chain driver
//! turns the signal into a descriptive unsupported-operation error.

mod aggregate;
mod filter;
mod join;
mod order;
mod page;
mod select;


use crate::{
    model::EntityModel,
    query::{operator::QueryOp, plan::QueryPlan},
};
use thiserror::Error as ThisError;

///
/// Translation
///
/// Outcome of one translator application. `Unsupported` hands the
/// plan back untouched so callers can decide whether to fall back or
/// fail.
///

#[derive(Debug)]
pub enum Translation {
    Applied(QueryPlan),
    Unsupported { plan: QueryPlan, reason: String },
}

///
/// TranslateError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum TranslateError {
    #[error("operator '{operator}' cannot be translated: {reason}")]
    UnsupportedOperator { operator: String, reason: String },
}

/// Apply a single operator to a plan.
#[must_use]
pub fn apply(plan: QueryPlan, op: QueryOp) -> Translation {
    match op {
        QueryOp::Filter(expr) => filter::translate(plan, expr),
        QueryOp::OrderBy {
            property,
            direction,
        } => order::order_by(plan, &property, direction),
        QueryOp::ThenBy {
            property,
            direction,
        } => order::then_by(plan, &property, direction),
        QueryOp::Skip(expr) => page::skip(plan, expr),
        QueryOp::Take(expr) => page::take(plan, expr),
        QueryOp::TakeLast(expr) => page::take_last(plan, expr),
        QueryOp::StartAt { values, inclusive } => page::start_at(plan, values, inclusive),
        QueryOp::Include { navigation } => join::include(plan, &navigation),
        QueryOp::Join(join_op) => join::translate(plan, &join_op),
        QueryOp::Select(expr) => select::translate(plan, expr),
        QueryOp::Aggregate(op) => aggregate::translate(plan, op),
    }
}

/// Translate a full operator chain into a frozen plan.
pub fn translate(model: &'static EntityModel, ops: Vec<QueryOp>) -> Result<QueryPlan, TranslateError> {
    let mut plan = QueryPlan::new(model);

    for op in ops {
        let operator = op.to_string();
        plan = match apply(plan, op) {
            Translation::Applied(next) => next,
            Translation::Unsupported { reason, .. } => {
                return Err(TranslateError::UnsupportedOperator { operator, reason });
            }
        };
    }

    Ok(plan)
}

/// Map a host property path onto its store field path.
///
/// The first segment is looked up in the model; unknown or dotted
/// tails pass through unchanged (nested object fields are not
/// individually modeled).
pub(crate) fn resolve_field(model: &EntityModel, property: &str) -> String {
    match property.split_once('.') {
        Some((head, tail)) => match model.property(head) {
            Some(p) => format!("{}.{tail}", p.field),
            None => property.to_string(),
        },
        None => model
            .property(property)
            .map_or_else(|| property.to_string(), |p| p.field.to_string()),
    }
}
