use crate::query::{
    operator::AggregateOp,
    plan::{AggregateKind, AggregationSpec, QueryPlan},
    translate::{Translation, resolve_field},
};

/// Record the requested scalar aggregation on the plan.
///
/// Field-directed aggregates (sum/average/min/max) must name a target
/// property; count/any must not.
pub(super) fn translate(mut plan: QueryPlan, op: AggregateOp) -> Translation {
    let needs_field = matches!(
        op.kind,
        AggregateKind::Sum | AggregateKind::Average | AggregateKind::Min | AggregateKind::Max
    );

    let field = match (&op.property, needs_field) {
        (Some(property), true) => Some(resolve_field(plan.model(), property)),
        (None, false) => None,
        (None, true) => {
            return Translation::Unsupported {
                plan,
                reason: format!("{} requires a target property", op.kind),
            };
        }
        (Some(property), false) => {
            return Translation::Unsupported {
                plan,
                reason: format!("{} does not take a target property ('{property}')", op.kind),
            };
        }
    };

    let spec = AggregationSpec {
        kind: op.kind,
        field,
        result: op.result,
    };

    match plan.set_aggregation(spec) {
        Ok(()) => Translation::Applied(plan),
        Err(violation) => Translation::Unsupported {
            plan,
            reason: violation.to_string(),
        },
    }
}
