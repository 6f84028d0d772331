use std::ops::ControlFlow;
use std::ops::Range as ByteRange;

use super::{error, LintContext};
use crate::enums::EnumCategory;
use crate::symbol::{placeholders, Prefix, ICONS, SPECIAL_TIMELINE_IDS};

pub(super) fn ids_must_be_valid(context: &mut LintContext<'_>) -> ControlFlow<()> {
    let ast = context.ast;
    let mut references: Vec<(String, ByteRange<usize>)> = placeholders(context.document.text())
        .map(|it| (it.text, it.range))
        .collect();
    references.extend(ast.timeline_items().filter_map(|item| {
        let id = item.get("id")?;
        let key = id.as_str()?;
        Some((Prefix::Action.qualify(key), id.range.start..id.range.end))
    }));

    for (text, range) in references {
        let Some((prefix, key)) = Prefix::parse(&text) else {
            continue;
        };
        if is_valid(context, prefix, key) {
            continue;
        }
        let range = context.document.range_from_offsets(range);
        context.add(error(
            "invalid-id",
            format!("Unresolved {} {key}. Did you forget to define it?", prefix.describe()),
            range,
        ))?;
    }
    ControlFlow::Continue(())
}

fn is_valid(context: &LintContext<'_>, prefix: Prefix, key: &str) -> bool {
    let (ast, enums) = (context.ast, context.enums);
    let common = enums.common();
    match prefix {
        Prefix::Action => {
            ast.action(key).is_some()
                || common.is_some_and(|it| it.actions.contains_key(key))
                || SPECIAL_TIMELINE_IDS.contains(&key)
        }
        Prefix::Status => {
            ast.status(key).is_some() || common.is_some_and(|it| it.status.contains_key(key))
        }
        Prefix::Icon => ICONS.contains(&key),
        other => match EnumCategory::for_prefix(other) {
            Some(category) => !enums.is_loaded(category) || enums.contains(category, key),
            None => true,
        },
    }
}
