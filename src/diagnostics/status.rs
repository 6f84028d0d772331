use std::ops::ControlFlow;

use itertools::Itertools;

use super::prop_order::validate_property_order;
use super::{error, LintContext};
use crate::enums::EnumCategory;

const DAMAGE_OVER_TIME: &str = "dot";

pub(super) fn validate_status(context: &mut LintContext<'_>) -> ControlFlow<()> {
    let ast = context.ast;
    for pair in ast.section("status") {
        if pair.key.raw().is_none() || pair.value.as_map().is_none() {
            continue;
        }
        let status = &pair.value;

        validate_property_order(context, status, "status effect", true)?;

        let Some(kind) = status.get("type") else {
            let range = context.range(&pair.key.range);
            context.add(error(
                "missing-status-type",
                "Every status must specify the 'type' field.\nIf no suitable status type exists, add one to 'enums/status-types.yaml'.",
                range,
            ))?;
            continue;
        };
        let kind_range = context.range(&kind.range);

        let enums = context.enums;
        let known = kind.raw().is_some_and(|it| enums.contains(EnumCategory::StatusTypes, it));
        if enums.is_loaded(EnumCategory::StatusTypes) && !known {
            let allowed = enums
                .keys(EnumCategory::StatusTypes)
                .into_iter()
                .map(|it| format!("'{it}'"))
                .join(", ");
            context.add(error(
                "invalid-status-type",
                format!("The 'type' field must be one of the following values: {allowed}"),
                kind_range,
            ))?;
        }

        if kind.raw() == Some(DAMAGE_OVER_TIME) && !status.has("tick") {
            context.add(error(
                "missing-tick",
                "Damage-over-time status effects must define the tick damage (via 'tick').",
                kind_range,
            ))?;
        }
    }
    ControlFlow::Continue(())
}
