//! Shared test utilities for thaliak.
//!
//! Enum fixtures, sample raid documents and a one-call lint helper. Only compiled
//! when running tests.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use tower_lsp::lsp_types::{Diagnostic, NumberOrString, Url};

use crate::diagnostics::{lint, LintResult};
use crate::enums::{EnumCategory, EnumRegistry};
use crate::prop_order::PropertyOrderMemory;
use crate::text_document::TextDocument;
use crate::yaml::YamlDocument;

pub const COMMON_YAML: &str = "\
actions:
  auto: 0x6B0E
  enrage: 0x7C01
status:
  vuln: 0x0638
";

pub const DAMAGE_TYPES_YAML: &str = "\
magical:
  name: Magical
  description: Magical damage.
physical:
  name: Physical
  description: Physical damage.
";

pub const EXPANSIONS_YAML: &str = "\
6: Endwalker
7: Dawntrail
";

pub const MECHANIC_SHAPES_YAML: &str = "\
circle:
  name: Circle
  description: A circular area.
donut:
  name: Donut
  description: A ring around a safe center.
line:
  name: Line
  description: A straight line.
";

pub const MECHANIC_TYPES_YAML: &str = "\
aoe:
  name: AoE
  description: Avoidable area of effect.
raidwide:
  name: Raidwide
  description: Hits the whole party.
  players: 8
raidwide.sethp:
  name: Set HP
  description: Sets the party's HP.
  players: 8
stack:
  name: Stack
  description: Shared damage.
  players: 4
tb.mt:
  name: Tankbuster (MT)
  description: Hits the main tank.
  players: 1
  shapeful: true
spread:
  name: Spread
  description: Everyone takes a hit.
  players: 1
";

pub const STATUS_TYPES_YAML: &str = "\
dot:
  name: Damage over time
  description: Deals damage every tick.
debuff:
  name: Debuff
  description: A harmful effect.
";

pub const TERMS_YAML: &str = "\
tb: Tankbuster
raidwide: Damage that hits the whole party.
";

pub fn enum_texts() -> [(EnumCategory, &'static str); 7] {
    [
        (EnumCategory::Common, COMMON_YAML),
        (EnumCategory::DamageTypes, DAMAGE_TYPES_YAML),
        (EnumCategory::Expansions, EXPANSIONS_YAML),
        (EnumCategory::MechanicShapes, MECHANIC_SHAPES_YAML),
        (EnumCategory::MechanicTypes, MECHANIC_TYPES_YAML),
        (EnumCategory::StatusTypes, STATUS_TYPES_YAML),
        (EnumCategory::Terms, TERMS_YAML),
    ]
}

/// In-memory registry holding every fixture category.
pub fn enum_registry() -> EnumRegistry {
    EnumRegistry::from_texts(enum_texts())
}

/// Creates a workspace with `enums/` (all fixture files) and an empty `raids/`.
///
/// Returns a tuple of (TempDir, PathBuf) where:
/// - TempDir: The temp directory handle (must be kept alive for the test duration)
/// - PathBuf: The workspace root
///
/// The root is a non-hidden subdirectory since workspace searches skip `.*` dirs.
pub fn create_enums_fixture() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let root = temp_dir.path().join("workspace");
    fs::create_dir_all(root.join("enums")).expect("Failed to create enums/");
    fs::create_dir_all(root.join("raids")).expect("Failed to create raids/");
    for (category, text) in enum_texts() {
        fs::write(root.join("enums").join(category.file_name()), text)
            .expect("Failed to write enum file");
    }
    (temp_dir, root)
}

/// A valid raid header followed by `body`.
pub fn raid_document(body: &str) -> String {
    format!(
        "id: 1001\npatch: '6.1'\nby:\n  - id: 1\n    role: author\nboss: Zodiark\ndescription: Test fight.\nparty_hp: 50000\n{body}"
    )
}

pub fn text_document(text: &str) -> TextDocument {
    TextDocument::new(
        Url::parse("file:///workspace/raids/test.yaml").expect("valid test URI"),
        1,
        text,
    )
}

/// Lints `text` against the fixture enums with a fresh property-order memory.
pub fn lint_text(text: &str) -> LintResult {
    let document = text_document(text);
    let ast = YamlDocument::parse(text).expect("test document should parse");
    let mut memory = PropertyOrderMemory::new();
    lint(&document, &ast, &enum_registry(), &mut memory, 1000)
}

pub fn code_of(diagnostic: &Diagnostic) -> Option<&str> {
    match diagnostic.code.as_ref()? {
        NumberOrString::String(code) => Some(code),
        NumberOrString::Number(_) => None,
    }
}

/// Diagnostics with the given code, excluding the spawned hint breadcrumbs.
pub fn with_code<'a>(diagnostics: &'a [Diagnostic], code: &str) -> Vec<&'a Diagnostic> {
    diagnostics
        .iter()
        .filter(|diagnostic| code_of(diagnostic) == Some(code))
        .collect()
}
