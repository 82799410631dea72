use crate::{
    model::EntityModel,
    query::{
        operator::{CompositeKind, SelectBinding, SelectExpr, SelectSource, SubQuery},
        plan::{
            OrderClause, ProjectedField, ProjectionKind, ProjectionSpec, QueryPlan,
            SubAggregation, SubResourceProjection,
        },
        translate::{Translation, filter, resolve_field},
    },
};

/// Walk the result-construction expression and record a projection
/// spec, including nested sub-resource projections discovered through
/// included navigations.
pub(super) fn translate(mut plan: QueryPlan, expr: SelectExpr) -> Translation {
    let spec = match walk(plan.model(), expr) {
        Ok(spec) => spec,
        Err(reason) => return Translation::Unsupported { plan, reason },
    };

    // Sub-resource projections imply loading the navigation's children.
    for sub in &spec.sub_resources {
        if let Some(nav) = plan.model().navigation(&sub.navigation) {
            plan.add_include(crate::query::plan::IncludeSpec {
                navigation: nav.name.to_string(),
                is_collection: nav.is_collection(),
                target_collection: nav.target_collection,
                target: nav.target,
            });
        }
    }

    match plan.set_projection(spec) {
        Ok(()) => Translation::Applied(plan),
        Err(violation) => Translation::Unsupported {
            plan,
            reason: violation.to_string(),
        },
    }
}

fn walk(model: &'static EntityModel, expr: SelectExpr) -> Result<ProjectionSpec, String> {
    match expr {
        SelectExpr::Identity => Ok(ProjectionSpec {
            kind: ProjectionKind::Entity,
            fields: Vec::new(),
            sub_resources: Vec::new(),
        }),

        SelectExpr::Field(property) => {
            let name = property
                .rsplit('.')
                .next()
                .unwrap_or(property.as_str())
                .to_string();
            Ok(ProjectionSpec {
                kind: ProjectionKind::SingleField,
                fields: vec![ProjectedField {
                    source: resolve_field(model, &property),
                    name,
                    slot: -1,
                }],
                sub_resources: Vec::new(),
            })
        }

        SelectExpr::Composite { kind, bindings } => {
            let projection_kind = match kind {
                CompositeKind::Anonymous => ProjectionKind::Struct,
                CompositeKind::Settable => ProjectionKind::Settable,
                CompositeKind::Record => ProjectionKind::Record,
            };

            let mut fields = Vec::new();
            let mut sub_resources = Vec::new();

            for binding in bindings {
                if projection_kind == ProjectionKind::Record && binding.slot.is_none() {
                    return Err(format!(
                        "record projection member '{}' has no constructor slot",
                        binding.name
                    ));
                }
                lower_binding(model, binding, &mut fields, &mut sub_resources)?;
            }

            Ok(ProjectionSpec {
                kind: projection_kind,
                fields,
                sub_resources,
            })
        }
    }
}

fn lower_binding(
    model: &'static EntityModel,
    binding: SelectBinding,
    fields: &mut Vec<ProjectedField>,
    sub_resources: &mut Vec<SubResourceProjection>,
) -> Result<(), String> {
    let slot = binding.slot.map_or(-1, |s| i32::try_from(s).unwrap_or(-1));

    match binding.source {
        SelectSource::Property(property) => {
            fields.push(ProjectedField {
                source: resolve_field(model, &property),
                name: binding.name,
                slot,
            });
            Ok(())
        }
        SelectSource::SubQuery(sub) => {
            let mut lowered = lower_sub_query(model, binding.name, sub)?;
            lowered.slot = slot;
            sub_resources.push(lowered);
            Ok(())
        }
    }
}

/// Lower a shaped navigation query inside a projection. The child
/// model maps child property names; filters are restricted to plain
/// conjunctions (OR groups have no per-document evaluation order the
/// sub-resource loader could honor).
fn lower_sub_query(
    model: &'static EntityModel,
    result_name: String,
    sub: SubQuery,
) -> Result<SubResourceProjection, String> {
    let nav = model
        .navigation(&sub.navigation)
        .ok_or_else(|| format!("'{}' is not a configured navigation", sub.navigation))?;

    if !nav.is_collection() {
        return Err(format!(
            "sub-resource projection requires a collection navigation; '{}' is a reference",
            sub.navigation
        ));
    }

    let child = nav.target;

    let mut filters = Vec::new();
    if let Some(expr) = sub.filter {
        let parts = filter::decompose(child, expr)?;
        if !parts.groups.is_empty() {
            return Err("OR filters are not supported inside sub-resource projections".to_string());
        }
        filters = parts.clauses;
    }

    let order = sub
        .order
        .into_iter()
        .map(|(property, direction)| OrderClause {
            field: resolve_field(child, &property),
            direction,
        })
        .collect();

    let mut fields = Vec::new();
    let mut nested = Vec::new();
    for binding in sub.bindings {
        lower_binding(child, binding, &mut fields, &mut nested)?;
    }

    let aggregation = sub.aggregate.map(|(kind, property, result)| SubAggregation {
        kind,
        field: property.map(|p| resolve_field(child, &p)),
        result,
    });

    if aggregation.is_some() && !fields.is_empty() {
        return Err(format!(
            "sub-resource '{result_name}' cannot both aggregate and project child fields"
        ));
    }

    Ok(SubResourceProjection {
        navigation: sub.navigation,
        target_collection: nav.target_collection,
        target: child,
        filters,
        order,
        limit: sub.limit,
        fields,
        aggregation,
        result_name,
        slot: -1,
        nested,
    })
}
