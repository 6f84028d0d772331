//! Shared enum vocabularies.
//!
//! Raid documents reference vocabularies that live next to them in an `enums/`
//! directory (mechanic types, shapes, status types, damage types, terms and the
//! common action/status aliases). Each file is kept both as typed data and as a
//! position-tracking tree, the latter for go-to-definition targets.
//!
//! A missing or unparsable file leaves its category absent; everything that
//! depends on a category checks for it first. Entries are typed one at a time, so
//! a malformed entry is skipped without hiding the rest of its file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tower_lsp::lsp_types::Url;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::symbol::Prefix;
use crate::text_document::{PositionEncoding, TextDocument};
use crate::yaml::{Node, YamlDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumCategory {
    Common,
    DamageTypes,
    Expansions,
    MechanicShapes,
    MechanicTypes,
    StatusTypes,
    Terms,
}

impl EnumCategory {
    pub const ALL: [EnumCategory; 7] = [
        EnumCategory::Common,
        EnumCategory::DamageTypes,
        EnumCategory::Expansions,
        EnumCategory::MechanicShapes,
        EnumCategory::MechanicTypes,
        EnumCategory::StatusTypes,
        EnumCategory::Terms,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EnumCategory::Common => "common",
            EnumCategory::DamageTypes => "damage-types",
            EnumCategory::Expansions => "expansions",
            EnumCategory::MechanicShapes => "mechanic-shapes",
            EnumCategory::MechanicTypes => "mechanic-types",
            EnumCategory::StatusTypes => "status-types",
            EnumCategory::Terms => "terms",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.yaml", self.name())
    }

    pub fn from_file_name(file_name: &str) -> Option<EnumCategory> {
        EnumCategory::ALL
            .into_iter()
            .find(|category| category.file_name() == file_name)
    }

    /// The category a placeholder prefix resolves against, if it is enum-backed.
    pub fn for_prefix(prefix: Prefix) -> Option<EnumCategory> {
        match prefix {
            Prefix::Mechanic => Some(EnumCategory::MechanicTypes),
            Prefix::MechanicShape => Some(EnumCategory::MechanicShapes),
            Prefix::StatusType => Some(EnumCategory::StatusTypes),
            Prefix::DamageType => Some(EnumCategory::DamageTypes),
            Prefix::Term => Some(EnumCategory::Terms),
            Prefix::Action | Prefix::Status | Prefix::Icon => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedDescription {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MechanicType {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Whether actions of this type must declare a `shape`.
    #[serde(default)]
    pub shapeful: bool,
    /// Default number of players hit.
    pub players: Option<u32>,
}

/// Aliases shared by every raid document, `alias: game id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Common {
    #[serde(default)]
    pub actions: HashMap<String, Value>,
    #[serde(default)]
    pub status: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub enum EnumValue {
    Common(Common),
    Named(HashMap<String, NamedDescription>),
    MechanicTypes(HashMap<String, MechanicType>),
    Terms(HashMap<String, String>),
    Expansions(HashMap<u32, String>),
}

#[derive(Debug, Clone)]
pub struct EnumSource {
    pub value: EnumValue,
    pub ast: YamlDocument,
    pub document: TextDocument,
}

#[derive(Debug, Default)]
pub struct EnumRegistry {
    dir: Option<PathBuf>,
    sources: HashMap<EnumCategory, EnumSource>,
    versions: HashMap<Url, i32>,
    encoding: PositionEncoding,
}

impl EnumRegistry {
    pub fn empty() -> EnumRegistry {
        EnumRegistry::default()
    }

    /// Reads every known enum file in `dir`; files are parsed in parallel.
    pub fn load(dir: &Path) -> EnumRegistry {
        let sources = EnumCategory::ALL
            .par_iter()
            .filter_map(|category| {
                let path = dir.join(category.file_name());
                let text = match fs::read_to_string(&path) {
                    Ok(text) => text,
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                        debug!(path = %path.display(), "enum file missing");
                        return None;
                    }
                    Err(err) => {
                        warn!(path = %path.display(), %err, "failed to read enum file");
                        return None;
                    }
                };
                let uri = Url::from_file_path(&path).ok()?;
                parse_source(*category, uri, 0, text).map(|source| (*category, source))
            })
            .collect::<HashMap<_, _>>();

        info!(dir = %dir.display(), categories = sources.len(), "loaded enums");

        EnumRegistry {
            dir: Some(dir.to_path_buf()),
            sources,
            versions: HashMap::new(),
            encoding: PositionEncoding::default(),
        }
    }

    /// Builds a registry from in-memory texts; each gets a synthetic `file:///enums/` URI.
    pub fn from_texts<'a>(
        texts: impl IntoIterator<Item = (EnumCategory, &'a str)>,
    ) -> EnumRegistry {
        let sources = texts
            .into_iter()
            .filter_map(|(category, text)| {
                let uri = Url::parse(&format!("file:///enums/{}", category.file_name())).ok()?;
                parse_source(category, uri, 0, text.to_string()).map(|source| (category, source))
            })
            .collect();

        EnumRegistry {
            dir: None,
            sources,
            versions: HashMap::new(),
            encoding: PositionEncoding::default(),
        }
    }

    /// Positions into enum files count code units of `encoding`.
    pub fn with_position_encoding(mut self, encoding: PositionEncoding) -> EnumRegistry {
        self.encoding = encoding;
        for source in self.sources.values_mut() {
            source.document.set_encoding(encoding);
        }
        self
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn source(&self, category: EnumCategory) -> Option<&EnumSource> {
        self.sources.get(&category)
    }

    pub fn is_loaded(&self, category: EnumCategory) -> bool {
        self.sources.contains_key(&category)
    }

    pub fn common(&self) -> Option<&Common> {
        match &self.source(EnumCategory::Common)?.value {
            EnumValue::Common(common) => Some(common),
            _ => None,
        }
    }

    pub fn mechanic_types(&self) -> Option<&HashMap<String, MechanicType>> {
        match &self.source(EnumCategory::MechanicTypes)?.value {
            EnumValue::MechanicTypes(types) => Some(types),
            _ => None,
        }
    }

    pub fn mechanic_type(&self, key: &str) -> Option<&MechanicType> {
        self.mechanic_types()?.get(key)
    }

    /// Name/description categories: damage types, mechanic shapes and status types.
    pub fn named(&self, category: EnumCategory) -> Option<&HashMap<String, NamedDescription>> {
        match &self.source(category)?.value {
            EnumValue::Named(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn terms(&self) -> Option<&HashMap<String, String>> {
        match &self.source(EnumCategory::Terms)?.value {
            EnumValue::Terms(terms) => Some(terms),
            _ => None,
        }
    }

    pub fn expansions(&self) -> Option<&HashMap<u32, String>> {
        match &self.source(EnumCategory::Expansions)?.value {
            EnumValue::Expansions(expansions) => Some(expansions),
            _ => None,
        }
    }

    /// Keys of a category in file order.
    pub fn keys(&self, category: EnumCategory) -> Vec<&str> {
        self.source(category)
            .and_then(|source| source.ast.contents())
            .map(|root| root.keys().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, category: EnumCategory, key: &str) -> bool {
        self.source(category)
            .and_then(|source| source.ast.contents())
            .is_some_and(|root| root.has(key))
    }

    /// Display name and description of an enum entry.
    pub fn describe(&self, category: EnumCategory, key: &str) -> Option<(String, String)> {
        match &self.source(category)?.value {
            EnumValue::MechanicTypes(types) => types
                .get(key)
                .map(|it| (it.name.clone(), it.description.clone())),
            EnumValue::Named(entries) => entries
                .get(key)
                .map(|it| (it.name.clone(), it.description.clone())),
            EnumValue::Terms(terms) => terms.get(key).map(|it| (key.to_string(), it.clone())),
            EnumValue::Common(_) | EnumValue::Expansions(_) => None,
        }
    }

    /// The definition node of `key` in a category's source, with that source.
    pub fn definition(&self, category: EnumCategory, path: &[&str]) -> Option<(&EnumSource, &Node, &Node)> {
        let source = self.source(category)?;
        let mut node = source.ast.contents()?;
        let (last, parents) = path.split_last()?;
        for parent in parents {
            node = node.get(parent)?;
        }
        let pair = node.entry(last)?;
        Some((source, &pair.key, &pair.value))
    }

    /// The category a URI belongs to when it points into this registry's directory.
    pub fn category_for(&self, uri: &Url) -> Option<EnumCategory> {
        let dir = self.dir.as_deref()?;
        let path = uri.to_file_path().ok()?;
        if path.parent()? != dir {
            return None;
        }
        EnumCategory::from_file_name(path.file_name()?.to_str()?)
    }

    /// Re-parses an enum document edited in the editor. Returns whether anything was
    /// reparsed; a URI is reparsed at most once per version.
    pub fn refresh(&mut self, uri: &Url, version: i32, text: &str) -> bool {
        let Some(category) = self.category_for(uri) else {
            return false;
        };
        if self.versions.get(uri) == Some(&version) {
            return false;
        }
        self.versions.insert(uri.clone(), version);

        info!(category = category.name(), version, "refreshing enum");
        match parse_source(category, uri.clone(), version, text.to_string()) {
            Some(mut source) => {
                source.document.set_encoding(self.encoding);
                self.sources.insert(category, source);
            }
            None if self.sources.contains_key(&category) => {
                warn!(category = category.name(), version, "keeping last parsable enum file");
            }
            None => {}
        }
        true
    }
}

fn parse_source(category: EnumCategory, uri: Url, version: i32, text: String) -> Option<EnumSource> {
    let ast = match YamlDocument::parse(&text) {
        Ok(ast) => ast,
        Err(err) => {
            warn!(category = category.name(), %err, "failed to parse enum file");
            return None;
        }
    };

    let root = match serde_yaml::from_str::<Value>(&text) {
        Ok(Value::Mapping(root)) => root,
        Ok(Value::Null) => Mapping::new(),
        Ok(_) => {
            warn!(category = category.name(), "enum file is not a mapping");
            return None;
        }
        Err(err) => {
            warn!(category = category.name(), %err, "failed to parse enum file");
            return None;
        }
    };

    let value = match category {
        EnumCategory::Common => EnumValue::Common(Common {
            actions: section(category, &root, "actions"),
            status: section(category, &root, "status"),
        }),
        EnumCategory::MechanicTypes => EnumValue::MechanicTypes(entries(category, root)),
        EnumCategory::Terms => EnumValue::Terms(entries(category, root)),
        EnumCategory::Expansions => EnumValue::Expansions(
            entries::<String>(category, root)
                .into_iter()
                .filter_map(|(key, name)| match key.parse() {
                    Ok(id) => Some((id, name)),
                    Err(_) => {
                        warn!(category = category.name(), %key, "skipping non-numeric expansion");
                        None
                    }
                })
                .collect(),
        ),
        EnumCategory::DamageTypes | EnumCategory::MechanicShapes | EnumCategory::StatusTypes => {
            EnumValue::Named(entries(category, root))
        }
    };

    Some(EnumSource {
        value,
        ast,
        document: TextDocument::new(uri, version, text),
    })
}

/// Scalar keys as written; `6:` and `"6":` are the same entry.
fn key_text(key: &Value) -> Option<String> {
    match key {
        Value::String(key) => Some(key.clone()),
        Value::Number(key) => Some(key.to_string()),
        Value::Bool(key) => Some(key.to_string()),
        _ => None,
    }
}

/// Types every entry of `map` on its own, skipping the ones that do not fit.
fn entries<T: DeserializeOwned>(category: EnumCategory, map: Mapping) -> HashMap<String, T> {
    map.into_iter()
        .filter_map(|(key, value)| {
            let Some(key) = key_text(&key) else {
                warn!(category = category.name(), "skipping enum entry with a non-scalar key");
                return None;
            };
            match serde_yaml::from_value(value) {
                Ok(value) => Some((key, value)),
                Err(err) => {
                    warn!(category = category.name(), %key, %err, "skipping malformed enum entry");
                    None
                }
            }
        })
        .collect()
}

fn section(category: EnumCategory, root: &Mapping, name: &str) -> HashMap<String, Value> {
    match root.get(name) {
        Some(Value::Mapping(map)) => entries(category, map.clone()),
        Some(Value::Null) | None => HashMap::new(),
        Some(_) => {
            warn!(category = category.name(), section = name, "enum section is not a mapping");
            HashMap::new()
        }
    }
}

/// The `enums` directory belonging to a raid document: a sibling of the document's
/// parent directory.
pub fn locate_enums_dir(document_path: &Path) -> Option<PathBuf> {
    let dir = document_path.parent()?.parent()?.join("enums");
    dir.is_dir().then_some(dir)
}

/// Searches a workspace for an `enums` directory holding `mechanic-types.yaml`.
pub fn find_enums_dir(root: &Path) -> Option<PathBuf> {
    WalkDir::new(root)
        .max_depth(4)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
        })
        .filter_map(Result::ok)
        .find(|entry| {
            entry.file_type().is_dir()
                && entry.file_name() == "enums"
                && entry
                    .path()
                    .join(EnumCategory::MechanicTypes.file_name())
                    .is_file()
        })
        .map(|entry| entry.into_path())
}
