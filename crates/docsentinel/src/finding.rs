//! Detection findings: the normalized output of the comparison stages.
//!
//! Model output arrives in loose shapes (structured JSON, bare strings); it is
//! parsed into the single tagged [`Finding`] struct at the LLM boundary so no
//! later stage has to branch on shape.

use serde::{Deserialize, Serialize};

/// Severity of a finding, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Parses a severity string from model output.
    ///
    /// Unrecognized values normalize to the lowest priority instead of
    /// failing — the model is not trusted to stick to the enum.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "warning" => Severity::Warning,
            "info" => Severity::Info,
            other => {
                if !other.is_empty() {
                    log::debug!("Unknown severity '{}', defaulting to info", other);
                }
                Severity::Info
            }
        }
    }

    /// Penalty weight used by health scoring.
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Critical => 10,
            Severity::Warning => 5,
            Severity::Info => 1,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Which comparison stage produced a finding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    Contradiction,
    VisualDecay,
}

/// Where a finding came from.
///
/// `Fallback` marks stage-local substitutions: data the pipeline synthesized
/// after a collaborator failure so the run could continue. Reviewers and
/// health scoring must be able to tell it apart from genuine model output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Model,
    Fallback,
}

/// One detected discrepancy between the source document and a related one.
///
/// Immutable after creation; becomes the unit of human review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub kind: FindingKind,
    /// Free-form classification, e.g. "Navigation procedure", "Terminology".
    pub category: String,
    pub severity: Severity,
    /// What is wrong, in reviewer-facing language.
    pub message: String,
    /// Suggested fix text.
    #[serde(default)]
    pub suggestion: String,
    /// Verbatim span from the older document, if the model quoted one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_text: Option<String>,
    /// Verbatim or corrected span from the newer document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_text: Option<String>,
    /// Title of the related document that triggered the comparison.
    #[serde(default)]
    pub source_doc: String,
    /// Identifier of that related document.
    #[serde(default)]
    pub doc_id: String,
    pub provenance: Provenance,
}

impl Finding {
    /// Fills the related-document reference if the parser left it empty.
    pub fn with_source(mut self, source_doc: &str, doc_id: &str) -> Self {
        if self.source_doc.is_empty() {
            self.source_doc = source_doc.to_string();
        }
        if self.doc_id.is_empty() {
            self.doc_id = doc_id.to_string();
        }
        self
    }
}

/// Lifecycle status of a suggestion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Proposed,
}

/// A proposed fix derived from one finding. Pure transformation output of the
/// final pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub kind: FindingKind,
    pub doc_title: String,
    pub doc_id: String,
    pub detail: String,
    pub suggestion: String,
    pub status: SuggestionStatus,
}

impl Suggestion {
    pub fn from_finding(finding: &Finding) -> Self {
        Self {
            kind: finding.kind,
            doc_title: finding.source_doc.clone(),
            doc_id: finding.doc_id.clone(),
            detail: finding.message.clone(),
            suggestion: finding.suggestion.clone(),
            status: SuggestionStatus::Proposed,
        }
    }
}
