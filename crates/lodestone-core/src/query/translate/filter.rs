use crate::{
    expr::ValueExpr,
    model::{EntityModel, NavigationKind, PropertyKind},
    query::{
        operator::{CompareOp, FilterExpr},
        plan::{FilterClause, FilterOp, OrFilterGroup, QueryPlan},
        translate::Translation,
    },
};

/// Translate a boolean filter expression into AND-combined clauses
/// and OR-groups on the plan.
pub(super) fn translate(mut plan: QueryPlan, expr: FilterExpr) -> Translation {
    match decompose(plan.model(), expr) {
        Ok(parts) => {
            for clause in parts.clauses {
                plan.push_filter(clause);
            }
            for group in parts.groups {
                plan.push_or_group(group);
            }
            Translation::Applied(plan)
        }
        Err(reason) => Translation::Unsupported { plan, reason },
    }
}

///
/// Decomposed
///

#[derive(Debug, Default)]
pub(super) struct Decomposed {
    pub clauses: Vec<FilterClause>,
    pub groups: Vec<OrFilterGroup>,
}

/// Decompose a filter expression. Top-level ANDs flatten; a top-level
/// OR (or an OR conjunct) becomes one OR-group of simple clauses.
pub(super) fn decompose(model: &EntityModel, expr: FilterExpr) -> Result<Decomposed, String> {
    let mut parts = Decomposed::default();
    decompose_into(model, expr, &mut parts)?;
    Ok(parts)
}

fn decompose_into(
    model: &EntityModel,
    expr: FilterExpr,
    parts: &mut Decomposed,
) -> Result<(), String> {
    match expr {
        FilterExpr::And(conjuncts) => {
            for conjunct in conjuncts {
                decompose_into(model, conjunct, parts)?;
            }
            Ok(())
        }

        FilterExpr::Or(disjuncts) => {
            let mut clauses = Vec::with_capacity(disjuncts.len());
            for disjunct in disjuncts {
                let mut leaf_clauses = leaf(model, disjunct)?;
                if leaf_clauses.len() != 1 {
                    return Err(
                        "string-prefix filters cannot appear inside an OR group; \
                         each OR branch must be a single comparison"
                            .to_string(),
                    );
                }
                clauses.push(leaf_clauses.remove(0));
            }
            parts.groups.push(OrFilterGroup { clauses });
            Ok(())
        }

        FilterExpr::Not(inner) => decompose_into(model, negate(*inner)?, parts),

        leaf_expr => {
            parts.clauses.extend(leaf(model, leaf_expr)?);
            Ok(())
        }
    }
}

/// Translate one leaf predicate into native clauses. `StartsWith`
/// expands to a two-sided range; everything else maps 1:1.
fn leaf(model: &EntityModel, expr: FilterExpr) -> Result<Vec<FilterClause>, String> {
    match expr {
        FilterExpr::Compare {
            property,
            op,
            value,
        } => Ok(vec![clause(model, &property, op, value)?]),

        FilterExpr::StartsWith { property, value } => {
            let lower = clause(model, &property, CompareOp::Gte, value.clone())?;
            let upper = clause(
                model,
                &property,
                CompareOp::Lt,
                ValueExpr::PrefixUpperBound(Box::new(value)),
            )?;
            Ok(vec![lower, upper])
        }

        FilterExpr::And(_) | FilterExpr::Or(_) | FilterExpr::Not(_) => Err(
            "nested boolean composition is not expressible in the target query model".to_string(),
        ),
    }
}

/// Push a negation one level down. Only comparisons with a native
/// inverse survive; anything else is untranslatable.
fn negate(expr: FilterExpr) -> Result<FilterExpr, String> {
    match expr {
        FilterExpr::Compare {
            property,
            op,
            value,
        } => {
            let inverted = match op {
                CompareOp::Eq => CompareOp::Ne,
                CompareOp::Ne => CompareOp::Eq,
                CompareOp::Lt => CompareOp::Gte,
                CompareOp::Lte => CompareOp::Gt,
                CompareOp::Gt => CompareOp::Lte,
                CompareOp::Gte => CompareOp::Lt,
                CompareOp::In => CompareOp::NotIn,
                CompareOp::NotIn => CompareOp::In,
                CompareOp::Contains | CompareOp::ContainsAny => {
                    return Err(
                        "negated array-membership has no native operator".to_string()
                    );
                }
            };
            Ok(FilterExpr::Compare {
                property,
                op: inverted,
                value,
            })
        }
        other => Err(format!(
            "negation is only supported over simple comparisons, found {other:?}"
        )),
    }
}

/// Build one native clause, applying model metadata: reference
/// navigations rewrite the operand into a document path at resolve
/// time, enum properties record their variant table, collection
/// membership maps to the array-contains family.
fn clause(
    model: &EntityModel,
    property: &str,
    op: CompareOp,
    value: ValueExpr,
) -> Result<FilterClause, String> {
    // Equality against a configured reference navigation compares
    // document paths, not literals.
    if let Some(nav) = model.navigation(property) {
        let NavigationKind::Reference { field, .. } = nav.kind else {
            return Err(format!(
                "collection navigation '{property}' cannot be used in a filter"
            ));
        };
        let native = match op {
            CompareOp::Eq => FilterOp::Eq,
            CompareOp::Ne => FilterOp::Ne,
            CompareOp::In => FilterOp::In,
            CompareOp::NotIn => FilterOp::NotIn,
            _ => {
                return Err(format!(
                    "navigation '{property}' only supports equality and membership comparisons"
                ));
            }
        };
        let mut out = FilterClause::new(field, native, value);
        out.reference_collection = Some(nav.target_collection);
        return Ok(out);
    }

    let mapped = model.property(property.split('.').next().unwrap_or(property));
    if mapped.is_none() && !property.contains('.') {
        return Err(format!("property '{property}' is not mapped on '{}'", model.entity));
    }

    let field = super::resolve_field(model, property);
    let kind = if property.contains('.') {
        None
    } else {
        mapped.map(|p| &p.kind)
    };

    let is_list = matches!(kind, Some(PropertyKind::List));
    let native = match op {
        CompareOp::Eq => FilterOp::Eq,
        CompareOp::Ne => FilterOp::Ne,
        CompareOp::Lt => FilterOp::Lt,
        CompareOp::Lte => FilterOp::Lte,
        CompareOp::Gt => FilterOp::Gt,
        CompareOp::Gte => FilterOp::Gte,
        CompareOp::In => FilterOp::In,
        CompareOp::NotIn => FilterOp::NotIn,
        CompareOp::Contains => {
            if !is_list {
                return Err(format!(
                    "'contains' requires a collection-typed property; '{property}' is not one"
                ));
            }
            FilterOp::ArrayContains
        }
        CompareOp::ContainsAny => {
            if !is_list {
                return Err(format!(
                    "'contains any' requires a collection-typed property; '{property}' is not one"
                ));
            }
            FilterOp::ArrayContainsAny
        }
    };

    let mut out = FilterClause::new(field, native, value);
    if let Some(&PropertyKind::Enum { variants }) = kind {
        out.enum_origin = Some(variants);
    }
    if let Some(&PropertyKind::Reference { collection }) = kind {
        out.reference_collection = Some(collection);
    }

    Ok(out)
}
