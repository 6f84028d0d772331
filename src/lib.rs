//! thaliak: a Language Server for raid timeline documents
//!
//! This crate provides the editing intelligence behind the `thaliak` server for the
//! YAML documents that describe raid-boss fights: their actions, status effects,
//! timelines and graphing diagrams.
//!
//! # Overview
//!
//! - **Diagnostics**: fight-specific lint rules with auto-fixes
//! - **Symbol Resolution**: `prefix:key` placeholders and field values under the cursor
//! - **Navigation**: hover, go-to-definition and find-references, including the shared
//!   enum files
//! - **Autocomplete**: placeholders, field values and the `unverified()` marker
//! - **Colors**: swatches for hex and `rgb()` literals
//!
//! # Architecture
//!
//! - [`yaml`]: position-tracking YAML trees
//! - [`enums`]: the shared vocabularies in the `enums/` directory
//! - [`symbol`]: placeholder and field resolution
//! - [`diagnostics`]: the rule engine
//! - [`workspace`]: session state shared by every request
//! - [`config`]: settings
//!
//! # Usage
//!
//! ```ignore
//! use thaliak::config::Settings;
//! use thaliak::workspace::Workspace;
//!
//! let mut workspace = Workspace::new(Settings::default(), Some(root));
//! workspace.open(uri.clone(), 1, text);
//! let diagnostics = workspace.lint(&uri);
//! ```

// Document model
pub mod enums;
pub mod text_document;
pub mod yaml;

// Analysis
pub mod diagnostics;
pub mod graphing;
pub mod prop_order;
pub mod symbol;

// LSP feature modules
pub mod codeactions;
pub mod color;
pub mod completion;
pub mod gotodef;
pub mod hover;
pub mod references;

// Session and configuration
pub mod config;
pub mod workspace;

// Test utilities (only available in test builds)
#[cfg(test)]
pub mod test_utils;
