use crate::{
    expr::ValueExpr,
    query::{
        plan::{CursorSpec, QueryPlan},
        translate::Translation,
    },
    value::Value,
};

/// Literal page operands must be non-negative integers; deferred
/// expressions are kept as-is and checked at resolution.
fn check_page_operand(expr: &ValueExpr, operator: &str) -> Option<String> {
    match expr {
        ValueExpr::Constant(Value::Int(n)) if *n < 0 => {
            Some(format!("{operator} requires a non-negative count, found {n}"))
        }
        ValueExpr::Constant(Value::Int(_)) => None,
        ValueExpr::Constant(other) => Some(format!(
            "{operator} requires an integer count, found {other}"
        )),
        _ => None,
    }
}

pub(super) fn skip(mut plan: QueryPlan, expr: ValueExpr) -> Translation {
    if let Some(reason) = check_page_operand(&expr, "skip") {
        return Translation::Unsupported { plan, reason };
    }
    plan.set_offset(expr);
    Translation::Applied(plan)
}

pub(super) fn take(mut plan: QueryPlan, expr: ValueExpr) -> Translation {
    if let Some(reason) = check_page_operand(&expr, "take") {
        return Translation::Unsupported { plan, reason };
    }
    plan.set_limit(expr);
    Translation::Applied(plan)
}

pub(super) fn take_last(mut plan: QueryPlan, expr: ValueExpr) -> Translation {
    if let Some(reason) = check_page_operand(&expr, "take_last") {
        return Translation::Unsupported { plan, reason };
    }
    if plan.order().is_empty() {
        return Translation::Unsupported {
            plan,
            reason: "take_last requires an explicit ordering".to_string(),
        };
    }
    plan.set_limit_to_last(expr);
    Translation::Applied(plan)
}

/// Cursor boundary: one value per order clause, checked here because
/// the ordering is already known at translation time.
pub(super) fn start_at(mut plan: QueryPlan, values: Vec<ValueExpr>, inclusive: bool) -> Translation {
    if plan.order().is_empty() {
        return Translation::Unsupported {
            plan,
            reason: "a start cursor requires an explicit ordering".to_string(),
        };
    }
    if values.len() != plan.order().len() {
        let reason = format!(
            "cursor arity mismatch: {} boundary values for {} order clauses",
            values.len(),
            plan.order().len()
        );
        return Translation::Unsupported { plan, reason };
    }
    plan.set_cursor(CursorSpec { values, inclusive });
    Translation::Applied(plan)
}
