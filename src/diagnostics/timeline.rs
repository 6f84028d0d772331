use std::ops::ControlFlow;

use tower_lsp::lsp_types::{Diagnostic, Range};

use super::prop_order::validate_property_order;
use super::{error, related, LintContext};
use crate::yaml::Node;

pub(super) fn validate_timeline(context: &mut LintContext<'_>) -> ControlFlow<()> {
    let ast = context.ast;
    match ast.get("timeline").and_then(Node::as_seq) {
        Some(items) => validate_timeline_items(context, items),
        None => ControlFlow::Continue(()),
    }
}

/// Checks one list of timeline items, either the top-level timeline or an action's
/// `children`.
pub(super) fn validate_timeline_items(context: &mut LintContext<'_>, items: &[Node]) -> ControlFlow<()> {
    let mut last: Option<(f64, Range)> = None;

    for item in items.iter().filter(|it| it.as_map().is_some()) {
        validate_property_order(context, item, "timeline item", false)?;

        if let Some(at) = item.get("at") {
            if let Some(value) = at.as_f64() {
                let range = context.range(&at.range);
                if let Some((last_at, last_range)) = last.filter(|(last_at, _)| *last_at > value) {
                    let location = context.location(last_range);
                    context.add(Diagnostic {
                        related_information: Some(vec![related(
                            location,
                            "Item should be placed before this one.",
                        )]),
                        ..error(
                            "timeline-order",
                            format!(
                                "All timeline items must be in order, but this item (at {value}ms) comes before the last item (at {last_at}ms)."
                            ),
                            range,
                        )
                    })?;
                }
                last = Some((value, range));
            }
        }

        check_inferred_fields(context, item)?;
    }

    ControlFlow::Continue(())
}

/// Flags `count` and `players` values that repeat what the referenced action or its
/// mechanic type already imply.
fn check_inferred_fields(context: &mut LintContext<'_>, item: &Node) -> ControlFlow<()> {
    let ast = context.ast;
    let Some(action_id) = item.get("id").and_then(Node::raw) else {
        return ControlFlow::Continue(());
    };
    let Some(action) = ast.action(action_id).map(|it| &it.value) else {
        return ControlFlow::Continue(());
    };
    let same = |field: &str| -> Option<f64> {
        let value = item.get(field)?.as_f64()?;
        (action.get(field)?.as_f64()? == value).then_some(value)
    };

    if let (Some(count), Some(_)) = (item.get("count"), same("count")) {
        let range = context.range(&count.range);
        context.add(error(
            "redundant-count",
            format!("This value can be inferred from '{action_id}' and should be omitted."),
            range,
        ))?;
    }

    let Some(players) = item.get("players") else {
        return ControlFlow::Continue(());
    };
    let mechanic = action.get("mechanic").and_then(Node::raw);
    let source = match same("players") {
        Some(_) => Some(action_id),
        None => mechanic.filter(|key| {
            let default = context.enums.mechanic_type(key).and_then(|it| it.players);
            default.is_some_and(|it| players.as_f64() == Some(f64::from(it)))
        }),
    };
    if let Some(source) = source {
        let range = context.range(&players.range);
        context.add(error(
            "redundant-players",
            format!("This value can be inferred from '{source}' and should be omitted."),
            range,
        ))?;
    }

    ControlFlow::Continue(())
}
