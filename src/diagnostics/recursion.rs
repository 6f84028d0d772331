use std::collections::HashSet;
use std::ops::ControlFlow;

use tower_lsp::lsp_types::Diagnostic;

use super::{error, related, LintContext};
use crate::yaml::{Node, Pair};

/// Cycles already reported, so a loop is flagged once whichever action it is
/// entered from.
#[derive(Default)]
struct Reported {
    chains: Vec<String>,
    loops: HashSet<Vec<String>>,
}

impl Reported {
    /// Records the chain; `false` when it was reported before.
    fn insert(&mut self, chain: &str, cycle: &[&str]) -> bool {
        if self.chains.iter().any(|it| it.contains(chain)) {
            return false;
        }
        self.chains.push(chain.to_string());
        self.loops.insert(canonical(cycle))
    }
}

/// The cycle rotated to start at its smallest id.
fn canonical(cycle: &[&str]) -> Vec<String> {
    let start = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, id)| **id)
        .map_or(0, |(i, _)| i);
    cycle[start..]
        .iter()
        .chain(&cycle[..start])
        .map(|it| it.to_string())
        .collect()
}

pub(super) fn must_not_recurse(context: &mut LintContext<'_>) -> ControlFlow<()> {
    let ast = context.ast;
    let actions = ast.section("actions");
    let mut reported = Reported::default();
    let mut graph = Vec::new();
    for action in actions {
        check_action(context, actions, action, &mut graph, &mut reported)?;
    }
    ControlFlow::Continue(())
}

fn check_action<'a>(
    context: &mut LintContext<'_>,
    actions: &'a [Pair],
    action: &'a Pair,
    graph: &mut Vec<&'a Node>,
    reported: &mut Reported,
) -> ControlFlow<()> {
    if action.key.raw().is_none() || action.value.as_map().is_none() {
        return ControlFlow::Continue(());
    }
    let Some(children) = action.value.get("children").and_then(Node::as_seq) else {
        return ControlFlow::Continue(());
    };

    graph.push(&action.key);
    for child in children {
        let Some(id) = child.get("id") else {
            continue;
        };
        let Some(child_key) = id.raw() else {
            continue;
        };

        let path: Vec<&str> = graph.iter().filter_map(|it| it.raw()).collect();
        if let Some(start) = path.iter().position(|it| *it == child_key) {
            let chain = format!("{} -> {child_key}", path.join(" -> "));
            if !reported.insert(&chain, &path[start..]) {
                continue;
            }

            let related_information = graph
                .iter()
                .map(|key| {
                    related(
                        context.location(context.range(&key.range)),
                        "This action is part of the recursion graph.",
                    )
                })
                .collect();
            let range = context.range(&id.range);
            context.add(Diagnostic {
                related_information: Some(related_information),
                ..error(
                    "recursion",
                    format!("This child is contained in itself: {chain}"),
                    range,
                )
            })?;
            continue;
        }

        if let Some(child_action) = actions.iter().find(|it| it.key_str() == Some(child_key)) {
            check_action(context, actions, child_action, graph, reported)?;
        }
    }
    graph.pop();

    ControlFlow::Continue(())
}
