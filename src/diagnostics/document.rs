use std::ops::ControlFlow;

use super::{error, LintContext};
use crate::yaml::Node;

const AUTHOR_ROLE: &str = "author";

pub(super) fn must_specify_party_hp(context: &mut LintContext<'_>) -> ControlFlow<()> {
    let ast = context.ast;
    let wip = ast.get("wip").and_then(Node::as_bool).unwrap_or(false);
    if wip || ast.has("party_hp") {
        return ControlFlow::Continue(());
    }
    let range = context.document.range_from_offsets(0..1);
    context.add(error(
        "missing-party-hp",
        "Field 'party_hp' is required in non-work-in-progress timelines.",
        range,
    ))
}

pub(super) fn must_have_author(context: &mut LintContext<'_>) -> ControlFlow<()> {
    let Some(by) = context.ast.entry("by") else {
        return ControlFlow::Continue(());
    };
    let is_author = |contributor: &Node| contributor.get("role").and_then(Node::raw) == Some(AUTHOR_ROLE);

    let missing = match (by.value.as_seq(), by.value.as_map()) {
        (Some(contributors), _) => !contributors
            .iter()
            .any(|it| it.as_map().is_none() || is_author(it)),
        (None, Some(_)) => !is_author(&by.value),
        (None, None) => false,
    };
    if !missing {
        return ControlFlow::Continue(());
    }

    let range = context.range(&by.key.range);
    context.add(error(
        "missing-author",
        "Field 'by' must contain at least one contributor with the 'author' role.",
        range,
    ))
}
