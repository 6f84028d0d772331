//! Position-tracking YAML trees.
//!
//! Raid documents are parsed with `yaml-rust2`'s event stream into a small tree
//! whose nodes keep their byte ranges, so every diagnostic and location can point
//! back at the exact source text.
//!
//! | Accessor | Returns |
//! |----------|---------|
//! | [`YamlDocument::get`] | top-level value for a key |
//! | [`YamlDocument::action`] | `actions.<key>` entry (key and value) |
//! | [`YamlDocument::status`] | `status.<key>` entry |
//! | [`YamlDocument::is_raid_data`] | whether the top level looks like a raid document |

mod node;
mod parser;

pub use node::{Node, NodeKind, NodeRange, Pair, Scalar};

use thiserror::Error;
use yaml_rust2::scanner::ScanError;

#[derive(Debug, Error)]
pub enum YamlError {
    #[error("invalid YAML: {0}")]
    Scan(#[from] ScanError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct YamlDocument {
    contents: Option<Node>,
}

impl YamlDocument {
    pub fn parse(text: &str) -> Result<YamlDocument, YamlError> {
        Ok(YamlDocument {
            contents: parser::parse(text)?,
        })
    }

    pub fn contents(&self) -> Option<&Node> {
        self.contents.as_ref()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.contents.as_ref()?.get(key)
    }

    pub fn entry(&self, key: &str) -> Option<&Pair> {
        self.contents.as_ref()?.entry(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.entry(key).is_some()
    }

    /// Top-level map entries of `section` (`actions`, `status`, ...), in document order.
    pub fn section(&self, section: &str) -> &[Pair] {
        self.get(section)
            .and_then(Node::as_map)
            .unwrap_or_default()
    }

    pub fn action(&self, key: &str) -> Option<&Pair> {
        self.get("actions")?.entry(key)
    }

    pub fn status(&self, key: &str) -> Option<&Pair> {
        self.get("status")?.entry(key)
    }

    /// Whether `offset` lies inside the value of top-level `key`.
    pub fn in_section(&self, key: &str, offset: usize) -> bool {
        self.get(key).is_some_and(|node| node.range.contains(offset))
    }

    /// Timeline items of every action's `children` followed by those of the top-level
    /// `timeline`. Non-map items are skipped.
    pub fn timeline_items(&self) -> impl Iterator<Item = &Node> {
        let children = self
            .section("actions")
            .iter()
            .filter_map(|pair| pair.value.get("children").and_then(Node::as_seq))
            .flatten();
        let timeline = self.get("timeline").and_then(Node::as_seq).unwrap_or_default();
        children
            .chain(timeline)
            .filter(|item| item.as_map().is_some())
    }

    /// Raid documents carry a numeric `id`, a `patch`, contributors in `by`, a `boss`
    /// and a `description`.
    pub fn is_raid_data(&self) -> bool {
        let Some(root) = self.contents.as_ref() else {
            return false;
        };
        let is_number = |key: &str| root.get(key).and_then(Node::as_f64).is_some();
        let is_string = |key: &str| root.get(key).and_then(Node::as_str).is_some();

        is_number("id")
            && is_string("patch")
            && root.has("by")
            && is_string("boss")
            && is_string("description")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let document = YamlDocument::parse(
            "actions:\n  boom:\n    mechanic: aoe\nstatus:\n  burn:\n    type: dot\n",
        )
        .unwrap();
        assert!(document.action("boom").is_some());
        assert!(document.action("burn").is_none());
        assert_eq!(
            document.status("burn").and_then(|pair| pair.value.get("type")).and_then(Node::as_str),
            Some("dot")
        );
        assert_eq!(document.section("actions").len(), 1);
        assert!(document.section("timeline").is_empty());
    }

    /// Test: raid detection requires every identifying top-level field
    #[test]
    fn test_is_raid_data() {
        let raid = YamlDocument::parse(
            "id: 1001\npatch: '6.1'\nby: 1\nboss: Zodiark\ndescription: The first fight.\n",
        )
        .unwrap();
        assert!(raid.is_raid_data());

        let enum_file = YamlDocument::parse("aoe:\n  name: AoE\n").unwrap();
        assert!(!enum_file.is_raid_data());
    }

    #[test]
    fn test_empty_document() {
        let document = YamlDocument::parse("").unwrap();
        assert!(document.contents().is_none());
        assert!(!document.is_raid_data());
    }
}
