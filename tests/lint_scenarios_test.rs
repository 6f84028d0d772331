//! End-to-end lint scenarios.
//!
//! Each test lays out a workspace on disk (`enums/` next to `raids/`), opens raid
//! documents through [`Workspace`] and checks the published diagnostics.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use tower_lsp::lsp_types::{CodeActionOrCommand, Diagnostic, NumberOrString, Url};

use thaliak::codeactions::code_actions;
use thaliak::config::Settings;
use thaliak::text_document::TextDocument;
use thaliak::workspace::Workspace;

const ENUMS: [(&str, &str); 7] = [
    ("common.yaml", "actions:\n  auto: 0x6B0E\nstatus:\n  vuln: 0x0638\n"),
    (
        "damage-types.yaml",
        "magical:\n  name: Magical\n  description: Magical damage.\nphysical:\n  name: Physical\n  description: Physical damage.\n",
    ),
    ("expansions.yaml", "6: Endwalker\n"),
    (
        "mechanic-shapes.yaml",
        "circle:\n  name: Circle\n  description: A circular area.\n",
    ),
    (
        "mechanic-types.yaml",
        "aoe:\n  name: AoE\n  description: Avoidable area of effect.\nraidwide:\n  name: Raidwide\n  description: Hits the whole party.\n  players: 8\ntb.mt:\n  name: Tankbuster (MT)\n  description: Hits the main tank.\n  players: 1\n  shapeful: true\n",
    ),
    (
        "status-types.yaml",
        "dot:\n  name: Damage over time\n  description: Deals damage every tick.\n",
    ),
    ("terms.yaml", "tb: Tankbuster\n"),
];

const HEADER: &str = "id: 1001\npatch: '6.1'\nby:\n  - id: 1\n    role: author\nboss: Zodiark\ndescription: Test fight.\nparty_hp: 50000\n";

/// Workspace root with the enum files written out and an empty `raids/`.
///
/// Keep the TempDir alive for the duration of the test.
fn create_workspace_dir() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let root = temp_dir.path().join("workspace");
    fs::create_dir_all(root.join("enums")).expect("Failed to create enums/");
    fs::create_dir_all(root.join("raids")).expect("Failed to create raids/");
    for (name, text) in ENUMS {
        fs::write(root.join("enums").join(name), text).expect("Failed to write enum file");
    }
    (temp_dir, root)
}

struct Scenario {
    _temp_dir: TempDir,
    root: PathBuf,
    workspace: Workspace,
}

impl Scenario {
    fn new() -> Scenario {
        Scenario::with_settings(Settings::default())
    }

    fn with_settings(settings: Settings) -> Scenario {
        let (temp_dir, root) = create_workspace_dir();
        let workspace = Workspace::new(settings, Some(root.clone()));
        Scenario {
            _temp_dir: temp_dir,
            root,
            workspace,
        }
    }

    fn uri(&self, name: &str) -> Url {
        Url::from_file_path(self.root.join("raids").join(name)).unwrap()
    }

    fn lint(&mut self, name: &str, text: &str) -> Vec<Diagnostic> {
        let uri = self.uri(name);
        self.workspace.open(uri.clone(), 1, text.to_string());
        self.workspace.lint(&uri).unwrap()
    }
}

fn with_code<'a>(diagnostics: &'a [Diagnostic], code: &str) -> Vec<&'a Diagnostic> {
    diagnostics
        .iter()
        .filter(|it| it.code == Some(NumberOrString::String(code.to_string())))
        .collect()
}

fn line_of(text: &str, prefix: &str) -> u32 {
    text.lines().position(|it| it.starts_with(prefix)).unwrap() as u32
}

#[test]
fn test_clean_document() {
    let mut scenario = Scenario::new();
    let text = format!(
        "{HEADER}actions:\n  boom:\n    name: Boom\n    mechanic: raidwide\n    damage: 40000\ntimeline:\n  - at: 0\n    id: boom\n  - at: 1000\n    id: auto\n"
    );
    let diagnostics = scenario.lint("clean.yaml", &text);
    assert!(diagnostics.is_empty(), "Unexpected: {diagnostics:?}");
}

/// Test: missing players is reported on the action with the damage field as related info
#[test]
fn test_missing_players() {
    let mut scenario = Scenario::new();
    let text = format!("{HEADER}actions:\n  boom:\n    name: Boom\n    mechanic: aoe\n    damage: 50000\n");
    let diagnostics = scenario.lint("p1s.yaml", &text);

    let found = with_code(&diagnostics, "missing-players");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].message, "The 'players' field must be set for mechanic type 'aoe'");
    assert_eq!(found[0].range.start.line, line_of(&text, "  boom:"));

    let related = found[0].related_information.as_ref().unwrap();
    assert_eq!(related[0].location.range.start.line, line_of(&text, "    damage"));
}

/// Test: one malformed entry in an enum file does not silence the mechanic rules
#[test]
fn test_partial_enum_file_keeps_linting() {
    let mut scenario = Scenario::new();
    fs::write(
        scenario.root.join("enums").join("mechanic-types.yaml"),
        "aoe:\n  name: AoE\n  description: Avoidable area of effect.\ntb.mt:\n  description: half typed\n  players: 1\nbroken: 3\n",
    )
    .unwrap();
    let text = format!(
        "{HEADER}actions:\n  boom:\n    name: Boom\n    mechanic: aoe\n    damage: 50000\n  laser:\n    name: Laser\n    mechanic: nonexistent\n"
    );
    let diagnostics = scenario.lint("p1s.yaml", &text);

    assert_eq!(with_code(&diagnostics, "missing-players").len(), 1);
    let invalid = with_code(&diagnostics, "invalid-mechanic");
    assert_eq!(invalid.len(), 1);
    assert_eq!(invalid[0].range.start.line, line_of(&text, "    mechanic: nonexistent"));
}

#[test]
fn test_missing_author() {
    let mut scenario = Scenario::new();
    let text = "id: 1\npatch: '6.1'\nby: [{id: 1, role: editor}]\nboss: Zodiark\ndescription: Test fight.\nparty_hp: 1\n";
    let diagnostics = scenario.lint("p2s.yaml", text);
    assert_eq!(with_code(&diagnostics, "missing-author").len(), 1);
    assert_eq!(diagnostics.len(), 1, "Unexpected: {diagnostics:?}");
}

#[test]
fn test_unresolved_placeholder() {
    let mut scenario = Scenario::new();
    let text = format!("{HEADER}notes: 'Watch out for [a:nonexistent]'\n");
    let diagnostics = scenario.lint("p3s.yaml", &text);

    let found = with_code(&diagnostics, "invalid-id");
    assert_eq!(found.len(), 1);
    assert!(found[0].message.contains("action nonexistent"));
}

/// Test: a recursive action pair is reported once per pass, however often it is linted
#[test]
fn test_recursion_across_passes() {
    let mut scenario = Scenario::new();
    let text = format!(
        "{HEADER}actions:\n  a:\n    name: A\n    children:\n      - at: 0\n        id: b\n  b:\n    name: B\n    children:\n      - at: 0\n        id: a\n"
    );
    let uri = scenario.uri("p4s.yaml");
    scenario.workspace.open(uri.clone(), 1, text);

    for _ in 0..2 {
        let diagnostics = scenario.workspace.lint(&uri).unwrap();
        let found = with_code(&diagnostics, "recursion");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].message, "This child is contained in itself: a -> b -> a");
    }
}

#[test]
fn test_timeline_order() {
    let mut scenario = Scenario::new();
    let text = format!("{HEADER}timeline:\n  - at: 5000\n    id: auto\n  - at: 3000\n    id: auto\n");
    let diagnostics = scenario.lint("p5s.yaml", &text);

    let found = with_code(&diagnostics, "timeline-order");
    assert_eq!(found.len(), 1);
    assert!(found[0].message.contains("(at 3000ms)"));
}

#[test]
fn test_graphing_elements() {
    let mut scenario = Scenario::new();
    let text = format!(
        "{HEADER}graphing:\n  elements:\n    orb:\n      type: circle\n  graphs:\n    main:\n      - orb#1: [0, 0]\n        laser: [1, 1]\n      - orb#2: [2, 2]\n"
    );
    let diagnostics = scenario.lint("p6s.yaml", &text);

    assert_eq!(with_code(&diagnostics, "unresolved-graphing-element").len(), 1);
    let uninitialized = with_code(&diagnostics, "uninitialized-graphing-element");
    assert_eq!(uninitialized.len(), 1);
    assert!(uninitialized[0].message.contains("'orb#2'"));
}

#[test]
fn test_missing_shape() {
    let mut scenario = Scenario::new();
    let text = format!("{HEADER}actions:\n  buster:\n    name: Buster\n    mechanic: tb.mt\n    damage: 90000\n");
    let diagnostics = scenario.lint("p7s.yaml", &text);
    assert_eq!(with_code(&diagnostics, "missing-shape").len(), 1);
}

/// Test: an order learned in one document is fixed in another by a code action
#[test]
fn test_property_order_fix() {
    let mut scenario = Scenario::new();
    scenario.lint(
        "learn.yaml",
        &format!("{HEADER}actions:\n  first:\n    name: First\n    mechanic: raidwide\n    damage: 1000\n"),
    );

    let swapped = format!("{HEADER}actions:\n  second:\n    mechanic: raidwide\n    name: Second\n    damage: 1000\n");
    let diagnostics = scenario.lint("swapped.yaml", &swapped);
    let found = with_code(&diagnostics, "inconsistent-prop-order/action");
    assert_eq!(found.len(), 2, "Unexpected: {diagnostics:?}");

    let uri = scenario.uri("swapped.yaml");
    let fixable = scenario.workspace.fixable(&uri).to_vec();
    let target = found[0].clone();
    let snapshot = scenario.workspace.snapshot(&uri).unwrap();
    let actions = code_actions(snapshot, target.range, &[target.clone()], &fixable);

    let CodeActionOrCommand::CodeAction(fix) = &actions[0] else {
        panic!("expected a code action");
    };
    assert_eq!(fix.title, "Fix this 'inconsistent-prop-order/action' problem");

    let changes = fix.edit.as_ref().unwrap().changes.as_ref().unwrap();
    let mut edits = changes[&uri].clone();
    edits.sort_by_key(|it| std::cmp::Reverse(it.range.start));

    let document = TextDocument::new(uri.clone(), 1, swapped.clone());
    let mut fixed = swapped.clone();
    for edit in edits {
        let start = document.offset_at(edit.range.start);
        let end = document.offset_at(edit.range.end);
        fixed.replace_range(start..end, &edit.new_text);
    }
    assert!(fixed.ends_with("  second:\n    name: Second\n    mechanic: raidwide\n    damage: 1000\n"));

    let relinted = scenario.lint("swapped.yaml", &fixed);
    assert!(with_code(&relinted, "inconsistent-prop-order/action").is_empty());
}

/// Test: relinting an unchanged document gives the same diagnostics
#[test]
fn test_relint_is_idempotent() {
    let mut scenario = Scenario::new();
    let text = format!(
        "{HEADER}actions:\n  boom:\n    name: Boom\n    mechanic: aoe\n    damage: 1\ntimeline:\n  - at: 10\n    id: boom\n  - at: 5\n    id: ghost\n"
    );
    let uri = scenario.uri("p8s.yaml");
    scenario.workspace.open(uri.clone(), 1, text);

    let first = scenario.workspace.lint(&uri).unwrap();
    let second = scenario.workspace.lint(&uri).unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

/// Test: the client's problem cap stops the lint early
#[test]
fn test_problem_cap() {
    let mut scenario = Scenario::new();
    let text = format!("{HEADER}notes: '[a:one] [a:two] [a:three] [a:four]'\n");
    assert_eq!(with_code(&scenario.lint("p9s.yaml", &text), "invalid-id").len(), 4);

    let payload = serde_json::json!({ "thaliak-timeline-linter": { "maxNumberOfProblems": 1 } });
    assert!(scenario.workspace.apply_client_settings(&payload));
    assert_eq!(scenario.lint("p9s.yaml", &text).len(), 1);
}

#[test]
fn test_non_raid_document_is_ignored() {
    let mut scenario = Scenario::new();
    let diagnostics = scenario.lint("notes.yaml", "title: notes\nbody: '[a:nonexistent]'\n");
    assert!(diagnostics.is_empty());
}

