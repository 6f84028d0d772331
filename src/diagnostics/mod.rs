//! Diagnostic rule engine.
//!
//! [`lint`] runs a fixed sequence of rules over one raid document. Rules share a
//! [`LintContext`] that accumulates diagnostics; once the configured maximum is
//! reached the current rule stops and later rules are skipped. Diagnostics already
//! collected are always returned.
//!
//! # Rules
//!
//! | Rule | Codes |
//! |------|-------|
//! | actions | `missing-mechanic`, `missing-name`, `invalid-shape`, `invalid-damage-type`, `invalid-mechanic`, `missing-players`, `redundant-players`, `missing-shape`, `too-many-players-hit`, `missing-damage` |
//! | status effects | `missing-status-type`, `invalid-status-type`, `missing-tick` |
//! | document | `missing-party-hp`, `missing-author` |
//! | references | `invalid-id` |
//! | children | `recursion` |
//! | timeline | `timeline-order`, `redundant-count`, `redundant-players` |
//! | graphing | `graphing-error`, `first-step-wildcard`, `unresolved-graphing-element`, `uninitialized-graphing-element` |
//! | property order | `inconsistent-prop-order/<kind>` (checked inside the action, status and timeline rules) |

mod actions;
mod document;
mod graphing;
mod ids;
mod prop_order;
mod recursion;
mod status;
mod timeline;

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{
    Diagnostic, DiagnosticRelatedInformation, DiagnosticSeverity, Location, NumberOrString, Range,
    TextEdit,
};
use tracing::info;

use crate::enums::EnumRegistry;
use crate::prop_order::PropertyOrderMemory;
use crate::text_document::TextDocument;
use crate::yaml::{NodeRange, YamlDocument};

pub const SOURCE: &str = "thaliak";

/// Auto-fix payload stored in [`Diagnostic::data`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixData {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text_edits: Vec<TextEdit>,
    /// Fixes sharing a uniqueness key are applied at most once per batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniqueness: Option<String>,
}

impl FixData {
    /// The fix attached to a diagnostic, if it carries any edits.
    pub fn of(diagnostic: &Diagnostic) -> Option<FixData> {
        serde_json::from_value::<FixData>(diagnostic.data.clone()?)
            .ok()
            .filter(|data| !data.text_edits.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LintResult {
    pub diagnostics: Vec<Diagnostic>,
    /// Diagnostics carrying auto-fix edits, for batch code actions.
    pub fixable: Vec<Diagnostic>,
}

pub struct LintContext<'a> {
    pub document: &'a TextDocument,
    pub ast: &'a YamlDocument,
    pub enums: &'a EnumRegistry,
    pub memory: &'a mut PropertyOrderMemory,
    max_problems: usize,
    result: LintResult,
}

type Rule = fn(&mut LintContext<'_>) -> ControlFlow<()>;

const RULES: [(&str, Rule); 8] = [
    ("actions", actions::validate_actions),
    ("status", status::validate_status),
    ("party-hp", document::must_specify_party_hp),
    ("author", document::must_have_author),
    ("ids", ids::ids_must_be_valid),
    ("recursion", recursion::must_not_recurse),
    ("timeline", timeline::validate_timeline),
    ("graphing", graphing::validate_graphing),
];

pub fn lint(
    document: &TextDocument,
    ast: &YamlDocument,
    enums: &EnumRegistry,
    memory: &mut PropertyOrderMemory,
    max_problems: usize,
) -> LintResult {
    let mut context = LintContext {
        document,
        ast,
        enums,
        memory,
        max_problems,
        result: LintResult::default(),
    };

    for (name, rule) in RULES {
        if rule(&mut context).is_break() || context.is_full() {
            info!(
                rule = name,
                problems = context.result.diagnostics.len(),
                uri = %document.uri(),
                "problem limit reached, skipping remaining rules"
            );
            break;
        }
    }

    context.result
}

impl LintContext<'_> {
    pub fn range(&self, range: &NodeRange) -> Range {
        self.document.range(range)
    }

    pub fn location(&self, range: Range) -> Location {
        Location {
            uri: self.document.uri().clone(),
            range,
        }
    }

    fn is_full(&self) -> bool {
        self.result.diagnostics.len() >= self.max_problems
    }

    /// Records a diagnostic together with hint breadcrumbs at its related locations.
    /// Breaks once the problem limit is reached.
    pub fn add(&mut self, mut diagnostic: Diagnostic) -> ControlFlow<()> {
        diagnostic.source = Some(SOURCE.into());

        let hints: Vec<Diagnostic> = diagnostic
            .related_information
            .iter()
            .flatten()
            .filter(|related| related.location.uri == *self.document.uri())
            .map(|related| Diagnostic {
                range: related.location.range,
                severity: Some(DiagnosticSeverity::HINT),
                source: Some(SOURCE.into()),
                message: related.message.clone(),
                related_information: Some(vec![DiagnosticRelatedInformation {
                    location: self.location(diagnostic.range),
                    message: "The original problem comes from here.".to_string(),
                }]),
                ..Default::default()
            })
            .collect();

        if FixData::of(&diagnostic).is_some() {
            self.result.fixable.push(diagnostic.clone());
        }
        self.result.diagnostics.push(diagnostic);
        self.result.diagnostics.extend(hints);

        match self.is_full() {
            true => ControlFlow::Break(()),
            false => ControlFlow::Continue(()),
        }
    }
}

pub fn problem(
    code: &str,
    severity: DiagnosticSeverity,
    message: impl Into<String>,
    range: Range,
) -> Diagnostic {
    Diagnostic {
        range,
        severity: Some(severity),
        code: Some(NumberOrString::String(code.to_string())),
        message: message.into(),
        ..Default::default()
    }
}

pub fn error(code: &str, message: impl Into<String>, range: Range) -> Diagnostic {
    problem(code, DiagnosticSeverity::ERROR, message, range)
}

pub fn warning(code: &str, message: impl Into<String>, range: Range) -> Diagnostic {
    problem(code, DiagnosticSeverity::WARNING, message, range)
}

pub fn related(location: Location, message: impl Into<String>) -> DiagnosticRelatedInformation {
    DiagnosticRelatedInformation {
        location,
        message: message.into(),
    }
}
