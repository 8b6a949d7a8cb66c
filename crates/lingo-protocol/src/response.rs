//! The tagged response model and its merge rules.
//!
//! Multi-handler endpoints fold per-handler results into one logical
//! response. Mergeable variants combine by list/map union and sort by
//! content, so folding results in any order produces the same output.
//! Merging anything else is an aggregation error, surfaced distinctly
//! from routing and handler failures.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use lingo_core::convention::IndexConvention;

use crate::error::ProtocolError;

/// A located finding: a diagnostic, a symbol, or a navigation target.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct QuickFix {
    pub file_name: String,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub text: String,
    /// Diagnostic severity, when the finding is a diagnostic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl QuickFix {
    /// Shift all position fields into the wire convention.
    fn encoded(&self, convention: IndexConvention) -> Self {
        Self {
            line: convention.encode_index(self.line),
            column: convention.encode_index(self.column),
            end_line: convention.encode_index(self.end_line),
            end_column: convention.encode_index(self.end_column),
            ..self.clone()
        }
    }
}

/// A list of findings; the aggregate response for diagnostics,
/// symbol search, and navigation endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct QuickFixResponse {
    pub quick_fixes: Vec<QuickFix>,
}

/// One completion suggestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CompletionItem {
    pub completion_text: String,
    pub display_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The aggregate completion response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CompletionResponse {
    pub items: Vec<CompletionItem>,
}

/// A file rewritten by a code action or formatting run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ModifiedFile {
    pub file_name: String,
    pub buffer: String,
}

/// A typed endpoint response.
///
/// The variant set is closed: each endpoint declares which variant it
/// produces, and the dispatcher folds multi-handler results through
/// [`Response::merge`].
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// No payload (buffer updates, broadcasts).
    Empty,
    /// Findings keyed by position.
    QuickFixes(QuickFixResponse),
    /// Completion suggestions.
    Completions(CompletionResponse),
    /// A fully reformatted buffer. Not mergeable.
    CodeFormat { buffer: String },
    /// Files modified by a code action. Not mergeable.
    ModifiedFiles(Vec<ModifiedFile>),
    /// Per-project-system workspace models, keyed by system key.
    Workspace(BTreeMap<String, serde_json::Value>),
    /// The owning project's model for one file. Not mergeable.
    Project(serde_json::Value),
}

impl Response {
    /// The variant name, for diagnostics and error messages.
    pub fn variant(&self) -> &'static str {
        match self {
            Response::Empty => "Empty",
            Response::QuickFixes(_) => "QuickFixes",
            Response::Completions(_) => "Completions",
            Response::CodeFormat { .. } => "CodeFormat",
            Response::ModifiedFiles(_) => "ModifiedFiles",
            Response::Workspace(_) => "Workspace",
            Response::Project(_) => "Project",
        }
    }

    /// Whether this variant supports merging with another result.
    pub fn is_mergeable(&self) -> bool {
        matches!(
            self,
            Response::Empty
                | Response::QuickFixes(_)
                | Response::Completions(_)
                | Response::Workspace(_)
        )
    }

    /// Combine two handler results into one.
    ///
    /// List variants concatenate and sort by content, map variants take
    /// the key union, and `Empty` is the identity. Mixing variants or
    /// merging a non-mergeable variant is an aggregation error.
    pub fn merge(self, other: Response) -> Result<Response, ProtocolError> {
        match (self, other) {
            (Response::Empty, other) => Ok(other),
            (this, Response::Empty) => Ok(this),
            (Response::QuickFixes(mut a), Response::QuickFixes(b)) => {
                a.quick_fixes.extend(b.quick_fixes);
                a.quick_fixes.sort();
                a.quick_fixes.dedup();
                Ok(Response::QuickFixes(a))
            }
            (Response::Completions(mut a), Response::Completions(b)) => {
                a.items.extend(b.items);
                a.items.sort();
                a.items.dedup();
                Ok(Response::Completions(a))
            }
            (Response::Workspace(mut a), Response::Workspace(b)) => {
                a.extend(b);
                Ok(Response::Workspace(a))
            }
            (this, other) if this.variant() == other.variant() => {
                Err(ProtocolError::NotMergeable(this.variant()))
            }
            (this, other) => Err(ProtocolError::VariantMismatch {
                left: this.variant(),
                right: other.variant(),
            }),
        }
    }

    /// Serialize to the wire, shifting positions into `convention`.
    pub fn to_wire(&self, convention: IndexConvention) -> serde_json::Value {
        match self {
            Response::Empty => serde_json::Value::Null,
            Response::QuickFixes(r) => {
                let encoded = QuickFixResponse {
                    quick_fixes: r.quick_fixes.iter().map(|q| q.encoded(convention)).collect(),
                };
                serde_json::to_value(encoded).unwrap_or(serde_json::Value::Null)
            }
            Response::Completions(r) => {
                serde_json::to_value(r).unwrap_or(serde_json::Value::Null)
            }
            Response::CodeFormat { buffer } => serde_json::json!({ "Buffer": buffer }),
            Response::ModifiedFiles(files) => {
                serde_json::json!({ "Changes": files })
            }
            Response::Workspace(map) => {
                serde_json::to_value(map).unwrap_or(serde_json::Value::Null)
            }
            Response::Project(value) => value.clone(),
        }
    }
}
