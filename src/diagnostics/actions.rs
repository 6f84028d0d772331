use std::ops::ControlFlow;

use itertools::Itertools;
use tower_lsp::lsp_types::Diagnostic;

use super::prop_order::validate_property_order;
use super::timeline::validate_timeline_items;
use super::{error, related, warning, LintContext};
use crate::enums::EnumCategory;
use crate::yaml::{Node, Pair};

/// Mechanic that sets the party's HP rather than dealing damage.
const SET_HP_MECHANIC: &str = "raidwide.sethp";
const PARTY_SIZE: f64 = 8.0;

pub(super) fn validate_actions(context: &mut LintContext<'_>) -> ControlFlow<()> {
    let ast = context.ast;
    for pair in ast.section("actions") {
        if pair.key.raw().is_none() || pair.value.as_map().is_none() {
            continue;
        }
        validate_action(context, pair)?;
    }
    ControlFlow::Continue(())
}

fn validate_action(context: &mut LintContext<'_>, pair: &Pair) -> ControlFlow<()> {
    let action = &pair.value;
    let key_range = context.range(&pair.key.range);

    validate_property_order(context, action, "action", true)?;

    if let Some(children) = action.get("children").and_then(Node::as_seq) {
        validate_timeline_items(context, children)?;
    }

    let mechanic = action.get("mechanic");
    if mechanic.is_none() {
        context.add(error(
            "missing-mechanic",
            "Every action must specify the 'mechanic' field.\nIf no suitable mechanic type exists, add one to 'enums/mechanic-types.yaml'.",
            key_range,
        ))?;
    }

    if !action.has("id") && !action.has("name") {
        context.add(error(
            "missing-name",
            "An action must set either a valid 'id' or a custom 'name'.",
            key_range,
        ))?;
    }

    let shape = action.get("shape");
    if let Some(shape) = shape {
        check_member(context, shape, "shape", EnumCategory::MechanicShapes, "invalid-shape")?;
    }
    if let Some(damage_type) = action.get("type") {
        check_member(context, damage_type, "type", EnumCategory::DamageTypes, "invalid-damage-type")?;
    }

    let Some(mechanic) = mechanic.filter(|it| it.as_scalar().is_some()) else {
        return ControlFlow::Continue(());
    };
    let mechanic_key = mechanic.raw().unwrap_or_default();
    let enums = context.enums;
    let Some(mechanic_types) = enums.mechanic_types() else {
        return ControlFlow::Continue(());
    };
    let Some(mechanic_type) = mechanic_types.get(mechanic_key) else {
        // Present in the file but skipped as malformed.
        if enums.contains(EnumCategory::MechanicTypes, mechanic_key) {
            return ControlFlow::Continue(());
        }
        let diagnostic = invalid_value(context, mechanic, "mechanic", EnumCategory::MechanicTypes, "invalid-mechanic");
        return context.add(diagnostic);
    };

    let damage = action.entry("damage");
    let has_damage = damage
        .and_then(|it| it.value.as_f64())
        .is_some_and(|it| it > 0.0);
    let players = action.get("players");
    let default_players = mechanic_type.players.map(f64::from);

    if let (None, Some(damage), None) = (default_players, damage.filter(|_| has_damage), players) {
        let damage_location = context.location(context.range(&damage.key.range));
        context.add(Diagnostic {
            related_information: Some(vec![related(
                damage_location,
                "Or remove this 'damage' field to avoid having to set 'players'.",
            )]),
            ..error(
                "missing-players",
                format!("The 'players' field must be set for mechanic type '{mechanic_key}'"),
                key_range,
            )
        })?;
    }

    let count = action.get("count").and_then(Node::as_f64).unwrap_or(1.0);

    if let (Some(default), Some(players)) = (default_players, players) {
        if players.as_f64() == Some(default) && default * count <= PARTY_SIZE {
            let range = context.range(&players.range);
            context.add(warning(
                "redundant-players",
                format!("This value can be inferred from '{mechanic_key}' and should be omitted."),
                range,
            ))?;
        }
    }

    if mechanic_type.shapeful && shape.is_none() {
        context.add(error(
            "missing-shape",
            format!("The 'shape' field must be set for mechanic type '{mechanic_key}'"),
            key_range,
        ))?;
    }

    if let (None, Some(default)) = (players, default_players) {
        if default * count > PARTY_SIZE {
            context.add(warning(
                "too-many-players-hit",
                format!(
                    "With {count} instances of this mechanic and a 'players' value of {default}, this mechanic targets more players than fit in a full party! Explicitly set the 'players' field to silence this warning."
                ),
                key_range,
            ))?;
        }
    }

    let implied_players = match players {
        Some(players) => players.as_f64(),
        None => default_players,
    };
    if let Some(implied) = implied_players.filter(|it| *it > 0.0) {
        if damage.is_none() && mechanic_key != SET_HP_MECHANIC && !action.has("children") {
            context.add(error(
                "missing-damage",
                format!("This action specifies that {implied} players take damage, but the 'damage' field is missing."),
                key_range,
            ))?;
        }
    }

    ControlFlow::Continue(())
}

fn check_member(
    context: &mut LintContext<'_>,
    value: &Node,
    field: &str,
    category: EnumCategory,
    code: &str,
) -> ControlFlow<()> {
    let enums = context.enums;
    if !enums.is_loaded(category) || value.raw().is_some_and(|it| enums.contains(category, it)) {
        return ControlFlow::Continue(());
    }
    let diagnostic = invalid_value(context, value, field, category, code);
    context.add(diagnostic)
}

fn invalid_value(
    context: &LintContext<'_>,
    value: &Node,
    field: &str,
    category: EnumCategory,
    code: &str,
) -> Diagnostic {
    let allowed = context
        .enums
        .keys(category)
        .into_iter()
        .map(|it| format!("'{it}'"))
        .join(", ");
    error(
        code,
        format!("The '{field}' field must be one of the following values: {allowed}"),
        context.range(&value.range),
    )
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{lint_text, raid_document, with_code};

    fn lint_actions(actions: &str) -> Vec<tower_lsp::lsp_types::Diagnostic> {
        lint_text(&raid_document(&format!("actions:\n{actions}"))).diagnostics
    }

    #[test]
    fn test_missing_mechanic_and_name() {
        let diagnostics = lint_actions("  boom:\n    damage: 0\n");
        assert_eq!(with_code(&diagnostics, "missing-mechanic").len(), 1);
        assert_eq!(with_code(&diagnostics, "missing-name").len(), 1);
    }

    /// Test: messages list every valid value in file order
    #[test]
    fn test_invalid_values_list_choices() {
        let diagnostics = lint_actions(
            "  boom:\n    name: Boom\n    mechanic: aoe\n    shape: square\n    type: unique\n    damage: 0\n",
        );
        let shape = with_code(&diagnostics, "invalid-shape");
        assert_eq!(
            shape[0].message,
            "The 'shape' field must be one of the following values: 'circle', 'donut', 'line'"
        );
        assert_eq!(with_code(&diagnostics, "invalid-damage-type").len(), 1);

        let mechanic = lint_actions("  boom:\n    name: Boom\n    mechanic: laser\n");
        assert_eq!(with_code(&mechanic, "invalid-mechanic").len(), 1);
    }

    #[test]
    fn test_missing_players_points_at_damage() {
        let text = raid_document("actions:\n  boom:\n    name: Boom\n    mechanic: aoe\n    damage: 50000\n");
        let diagnostics = lint_text(&text).diagnostics;
        let found = with_code(&diagnostics, "missing-players");
        assert_eq!(found.len(), 1);

        let boom_line = text.lines().position(|it| it == "  boom:").unwrap() as u32;
        let damage_line = text.lines().position(|it| it.starts_with("    damage")).unwrap() as u32;
        assert_eq!(found[0].range.start.line, boom_line, "Anchored at the action key");
        let related = &found[0].related_information.as_ref().unwrap()[0];
        assert_eq!(related.location.range.start.line, damage_line);
    }

    /// Test: shapeful mechanics always need a shape
    #[test]
    fn test_missing_shape() {
        let diagnostics = lint_actions("  buster:\n    name: Buster\n    mechanic: tb.mt\n    damage: 90000\n");
        assert_eq!(with_code(&diagnostics, "missing-shape").len(), 1);

        let with_shape = lint_actions(
            "  buster:\n    name: Buster\n    mechanic: tb.mt\n    shape: circle\n    damage: 90000\n",
        );
        assert!(with_code(&with_shape, "missing-shape").is_empty());
    }

    #[test]
    fn test_players_inference() {
        let redundant = lint_actions("  stack:\n    name: Stack\n    mechanic: stack\n    players: 4\n    damage: 1\n");
        assert_eq!(with_code(&redundant, "redundant-players").len(), 1);

        let too_many = lint_actions("  stacks:\n    name: Stacks\n    mechanic: stack\n    count: 3\n    damage: 1\n");
        let found = with_code(&too_many, "too-many-players-hit");
        assert_eq!(found.len(), 1);
        assert!(found[0].message.starts_with("With 3 instances"));
    }

    #[test]
    fn test_missing_damage_exemptions() {
        let missing = lint_actions("  boom:\n    name: Boom\n    mechanic: raidwide\n");
        assert_eq!(with_code(&missing, "missing-damage").len(), 1);

        let set_hp = lint_actions("  hp:\n    name: HP\n    mechanic: raidwide.sethp\n");
        assert!(with_code(&set_hp, "missing-damage").is_empty());

        let no_one = lint_actions("  fake:\n    name: Fake\n    mechanic: raidwide\n    players: 0\n");
        assert!(with_code(&no_one, "missing-damage").is_empty());
    }
}
