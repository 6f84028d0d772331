use std::collections::BTreeSet;
use std::ops::ControlFlow;

use super::{error, LintContext};
use crate::graphing::{is_special, resolve_key};
use crate::yaml::{Node, Pair};

pub(super) fn validate_graphing(context: &mut LintContext<'_>) -> ControlFlow<()> {
    let ast = context.ast;
    let Some(graphing) = ast.get("graphing") else {
        return ControlFlow::Continue(());
    };
    let (Some(elements), Some(graphs)) = (
        graphing.get("elements").and_then(Node::as_map),
        graphing.get("graphs").and_then(Node::as_map),
    ) else {
        return ControlFlow::Continue(());
    };

    let defined: BTreeSet<&str> = elements.iter().filter_map(|it| it.key.as_str()).collect();

    for graph in graphs {
        let Some(steps) = graph.value.as_seq() else {
            continue;
        };
        let mut first_step = BTreeSet::new();
        for (index, step) in steps.iter().enumerate() {
            let Some(items) = step.as_map() else {
                continue;
            };
            for item in items {
                validate_step_item(context, item, &defined, &mut first_step, index == 0)?;
            }
        }
    }
    ControlFlow::Continue(())
}

fn validate_step_item(
    context: &mut LintContext<'_>,
    item: &Pair,
    defined: &BTreeSet<&str>,
    first_step: &mut BTreeSet<String>,
    is_first: bool,
) -> ControlFlow<()> {
    let key_range = context.range(&item.key.range);
    let key = match item.key.raw() {
        Some(raw) => raw,
        None => context.document.slice(item.key.range.start..item.key.range.end),
    };

    let resolved = match resolve_key(key, first_step) {
        Ok(resolved) => resolved,
        Err(err) => return context.add(error("graphing-error", err.to_string(), key_range)),
    };

    if resolved.wildcard && is_first {
        context.add(error(
            "first-step-wildcard",
            "Wildcards in element identifiers may only be used in step 2 and onwards.",
            key_range,
        ))?;
    }

    let definitions = match &resolved.definition {
        Some(definition) => std::slice::from_ref(definition),
        None => resolved.elements.as_slice(),
    };
    for definition in definitions {
        if !defined.contains(definition.as_str()) && !is_special(definition) {
            context.add(error(
                "unresolved-graphing-element",
                format!("Failed to resolve '{definition}'. Did you remember to add the element definition to 'elements'?"),
                key_range,
            ))?;
        }
    }

    for element in resolved.elements {
        if is_first {
            first_step.insert(element);
        } else if !first_step.contains(&element) {
            context.add(error(
                "uninitialized-graphing-element",
                format!("Found uninitialized element '{element}'. All elements must be initialized in the first step of a graph."),
                key_range,
            ))?;
        }
    }

    ControlFlow::Continue(())
}
