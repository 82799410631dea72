use crate::{
    model::{NavigationKind, NavigationModel},
    query::{
        operator::{JoinOp, KeySelector},
        plan::{IncludeSpec, QueryPlan},
        translate::Translation,
    },
};

/// Ordinary eager-load of a configured navigation.
pub(super) fn include(mut plan: QueryPlan, navigation: &str) -> Translation {
    match plan.model().navigation(navigation) {
        Some(nav) => {
            plan.add_include(include_spec(nav));
            Translation::Applied(plan)
        }
        None => {
            let reason = format!(
                "'{navigation}' is not a configured navigation on '{}'",
                plan.model().entity
            );
            Translation::Unsupported { plan, reason }
        }
    }
}

/// Inner-join recovery.
///
/// The host framework represents an eager-load of a required
/// reference navigation as an inner join between the entity query and
/// the navigation target. When the outer key selector names (or reads
/// the reference field of) a configured navigation, the join is
/// rewritten into the same include used for ordinary eager-loads.
/// Any other join shape is untranslatable.
pub(super) fn translate(mut plan: QueryPlan, join: &JoinOp) -> Translation {
    let nav = match &join.outer_key {
        KeySelector::Navigation(name) => plan.model().navigation(name),
        KeySelector::Property(property) => plan.model().navigations.iter().find(|nav| {
            matches!(nav.kind, NavigationKind::Reference { field, .. } if field == property)
        }),
        KeySelector::Opaque(_) => None,
    };

    match nav {
        Some(nav) if !nav.is_collection() => {
            plan.add_include(include_spec(nav));
            Translation::Applied(plan)
        }
        Some(nav) => Translation::Unsupported {
            plan,
            reason: format!(
                "collection navigation '{}' cannot be eager-loaded through a join",
                nav.name
            ),
        },
        None => Translation::Unsupported {
            plan,
            reason: format!(
                "joins other than recognized navigation eager-loads are unsupported \
                 (outer key selector: {:?}, inner source: '{}')",
                join.outer_key, join.inner_source
            ),
        },
    }
}

fn include_spec(nav: &NavigationModel) -> IncludeSpec {
    IncludeSpec {
        navigation: nav.name.to_string(),
        is_collection: nav.is_collection(),
        target_collection: nav.target_collection,
        target: nav.target,
    }
}
