//! Session state shared by every request.
//!
//! A [`Workspace`] owns the open documents, a bounded cache of their parsed trees,
//! the enum registry (located and loaded on first use), the learned property order
//! and the auto-fixable diagnostics of the last lint of each document.
//!
//! | State | Reset by |
//! |-------|----------|
//! | documents | `close` |
//! | parsed trees | `close`, eviction, [`Workspace::reset`] |
//! | enums | [`Workspace::reset`] |
//! | property order | [`Workspace::reset`] |
//! | fixable diagnostics | next lint, `close`, [`Workspace::reset`] |

use std::collections::HashMap;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use tower_lsp::lsp_types::{Diagnostic, TextDocumentContentChangeEvent, Url};
use tracing::{debug, info};

use crate::config::Settings;
use crate::diagnostics;
use crate::enums::{find_enums_dir, locate_enums_dir, EnumRegistry};
use crate::prop_order::PropertyOrderMemory;
use crate::text_document::{PositionEncoding, TextDocument};
use crate::yaml::YamlDocument;

static NO_ENUMS: Lazy<EnumRegistry> = Lazy::new(EnumRegistry::empty);

/// Everything an editor feature needs to answer a request about one document.
#[derive(Clone, Copy)]
pub struct Snapshot<'a> {
    pub document: &'a TextDocument,
    /// `None` when the text is not valid YAML.
    pub ast: Option<&'a YamlDocument>,
    pub enums: &'a EnumRegistry,
}

struct CachedTree {
    version: i32,
    ast: Option<YamlDocument>,
    last_used: u64,
}

/// Parsed trees keyed by URI, reparsed when the document version moves and
/// evicted least recently used first.
struct ParserCache {
    entries: HashMap<Url, CachedTree>,
    capacity: usize,
    clock: u64,
}

impl ParserCache {
    fn new(capacity: usize) -> ParserCache {
        ParserCache {
            entries: HashMap::new(),
            capacity,
            clock: 0,
        }
    }

    fn get(&mut self, document: &TextDocument) -> Option<&YamlDocument> {
        self.clock += 1;
        let clock = self.clock;
        let uri = document.uri();

        let fresh = self
            .entries
            .get(uri)
            .is_some_and(|entry| entry.version == document.version());
        if !fresh {
            let ast = match YamlDocument::parse(document.text()) {
                Ok(ast) => Some(ast),
                Err(err) => {
                    debug!(%uri, %err, "document is not valid YAML");
                    None
                }
            };
            self.entries.insert(
                uri.clone(),
                CachedTree {
                    version: document.version(),
                    ast,
                    last_used: clock,
                },
            );
            self.evict(uri);
        }

        let entry = self.entries.get_mut(uri)?;
        entry.last_used = clock;
        entry.ast.as_ref()
    }

    fn evict(&mut self, keep: &Url) {
        while self.entries.len() > self.capacity.max(1) {
            let Some(oldest) = self
                .entries
                .iter()
                .filter(|(uri, _)| *uri != keep)
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(uri, _)| uri.clone())
            else {
                break;
            };
            debug!(uri = %oldest, "evicting parsed document");
            self.entries.remove(&oldest);
        }
    }

    fn contains(&self, uri: &Url) -> bool {
        self.entries.contains_key(uri)
    }

    fn remove(&mut self, uri: &Url) {
        self.entries.remove(uri);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

pub struct Workspace {
    settings: Settings,
    root: Option<PathBuf>,
    documents: HashMap<Url, TextDocument>,
    trees: ParserCache,
    enums: Option<EnumRegistry>,
    memory: PropertyOrderMemory,
    fixable: HashMap<Url, Vec<Diagnostic>>,
    encoding: PositionEncoding,
}

impl Workspace {
    pub fn new(settings: Settings, root: Option<PathBuf>) -> Workspace {
        Workspace {
            trees: ParserCache::new(settings.max_cached_documents),
            settings,
            root,
            documents: HashMap::new(),
            enums: None,
            memory: PropertyOrderMemory::new(),
            fixable: HashMap::new(),
            encoding: PositionEncoding::default(),
        }
    }

    /// Uses `enums` instead of locating a directory on disk.
    pub fn with_enums(mut self, enums: EnumRegistry) -> Workspace {
        self.enums = Some(enums.with_position_encoding(self.encoding));
        self
    }

    /// The position encoding agreed with the client, applied to every document.
    pub fn with_position_encoding(mut self, encoding: PositionEncoding) -> Workspace {
        self.encoding = encoding;
        self.enums = self
            .enums
            .take()
            .map(|enums| enums.with_position_encoding(encoding));
        for document in self.documents.values_mut() {
            document.set_encoding(encoding);
        }
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn root(&self) -> Option<&PathBuf> {
        self.root.as_ref()
    }

    /// Applies a client configuration payload; returns whether lint results may change.
    pub fn apply_client_settings(&mut self, payload: &serde_json::Value) -> bool {
        self.settings.apply_client_settings(payload)
    }

    /// Forgets everything learned in this session. Open documents stay open.
    pub fn reset(&mut self, root: Option<PathBuf>) {
        info!(root = ?root, "resetting workspace state");
        self.root = root;
        self.trees.clear();
        self.enums = None;
        self.memory.clear();
        self.fixable.clear();
    }

    /// Tracks a newly opened document. Returns whether it updated the enum registry.
    pub fn open(&mut self, uri: Url, version: i32, text: String) -> bool {
        let document = TextDocument::new(uri.clone(), version, text).with_encoding(self.encoding);
        self.documents.insert(uri.clone(), document);
        // Reopening may reuse a version number with different text.
        self.trees.remove(&uri);
        self.refresh_enums(&uri)
    }

    /// Applies editor changes. Returns whether they updated the enum registry.
    pub fn change(
        &mut self,
        uri: &Url,
        version: i32,
        changes: Vec<TextDocumentContentChangeEvent>,
    ) -> bool {
        let Some(document) = self.documents.get_mut(uri) else {
            debug!(%uri, "change for a document that is not open");
            return false;
        };
        document.apply_changes(version, changes);
        self.refresh_enums(uri)
    }

    pub fn close(&mut self, uri: &Url) {
        self.documents.remove(uri);
        self.trees.remove(uri);
        self.fixable.remove(uri);
    }

    pub fn document(&self, uri: &Url) -> Option<&TextDocument> {
        self.documents.get(uri)
    }

    pub fn open_documents(&self) -> Vec<Url> {
        self.documents.keys().cloned().collect()
    }

    pub fn is_cached(&self, uri: &Url) -> bool {
        self.trees.contains(uri)
    }

    pub fn enums(&self) -> &EnumRegistry {
        self.enums.as_ref().unwrap_or(&*NO_ENUMS)
    }

    pub fn memory(&self) -> &PropertyOrderMemory {
        &self.memory
    }

    pub fn snapshot(&mut self, uri: &Url) -> Option<Snapshot<'_>> {
        self.ensure_enums(uri);
        let document = self.documents.get(uri)?;
        let ast = self.trees.get(document);
        Some(Snapshot {
            document,
            ast,
            enums: self.enums.as_ref().unwrap_or(&*NO_ENUMS),
        })
    }

    /// Lints an open document. Documents that are not raid documents, or do not
    /// parse, get no diagnostics. `None` when the document is not open.
    pub fn lint(&mut self, uri: &Url) -> Option<Vec<Diagnostic>> {
        self.ensure_enums(uri);
        let document = self.documents.get(uri)?;
        let Some(ast) = self.trees.get(document).filter(|ast| ast.is_raid_data()) else {
            self.fixable.remove(uri);
            return Some(Vec::new());
        };

        let enums = self.enums.as_ref().unwrap_or(&*NO_ENUMS);
        let result = diagnostics::lint(
            document,
            ast,
            enums,
            &mut self.memory,
            self.settings.max_number_of_problems,
        );
        debug!(%uri, problems = result.diagnostics.len(), fixable = result.fixable.len(), "linted");
        self.fixable.insert(uri.clone(), result.fixable);
        Some(result.diagnostics)
    }

    /// Auto-fixable diagnostics of the last lint of `uri`.
    pub fn fixable(&self, uri: &Url) -> &[Diagnostic] {
        self.fixable.get(uri).map(Vec::as_slice).unwrap_or_default()
    }

    /// Loads the enum registry if it has not been located yet. The directory comes
    /// from the settings, then from the document's location, then from a search of
    /// the workspace root.
    fn ensure_enums(&mut self, uri: &Url) {
        if self.enums.is_some() {
            return;
        }
        let dir = self
            .settings
            .enums_dir
            .clone()
            .or_else(|| locate_enums_dir(&uri.to_file_path().ok()?))
            .or_else(|| find_enums_dir(self.root.as_ref()?));

        match dir {
            Some(dir) => {
                self.enums = Some(EnumRegistry::load(&dir).with_position_encoding(self.encoding))
            }
            None => debug!(%uri, "no enums directory found"),
        }
    }

    fn refresh_enums(&mut self, uri: &Url) -> bool {
        let (Some(enums), Some(document)) = (self.enums.as_mut(), self.documents.get(uri)) else {
            return false;
        };
        enums.refresh(uri, document.version(), document.text())
    }
}
