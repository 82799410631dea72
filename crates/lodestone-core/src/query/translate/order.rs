use crate::query::{
    plan::{OrderClause, OrderDirection, QueryPlan},
    translate::{Translation, resolve_field},
};

/// Primary ordering. Replaces any ordering already on the plan; the
/// store's compound ordering is built as an explicit clause list via
/// `then_by`.
pub(super) fn order_by(mut plan: QueryPlan, property: &str, direction: OrderDirection) -> Translation {
    let field = resolve_field(plan.model(), property);
    plan.replace_order(OrderClause { field, direction });
    Translation::Applied(plan)
}

/// Secondary ordering. Appends to the existing clause list; with no
/// prior ordering it degenerates to `order_by`.
pub(super) fn then_by(mut plan: QueryPlan, property: &str, direction: OrderDirection) -> Translation {
    let field = resolve_field(plan.model(), property);
    plan.append_order(OrderClause { field, direction });
    Translation::Applied(plan)
}
