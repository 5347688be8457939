use serde::{Deserialize, Serialize};

use crate::finding::{Finding, Suggestion};
use crate::search::RelatedDoc;
use crate::worker::job::ScanJob;

/// The document under scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub id: String,
    pub name: String,
}

/// A non-fatal degradation recorded during a run.
///
/// Substitution is not an error: the run continues on placeholder data, but
/// the original failure must stay visible so nobody mistakes synthetic
/// output for a healthy collaborator.
#[derive(Debug, Clone)]
pub enum ScanWarning {
    FetchFallback { error: String },
    SearchFallback { error: String },
    CompareFallback { doc_title: String, error: String },
    FeedbackUnavailable { error: String },
}

impl std::fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanWarning::FetchFallback { error } => {
                write!(f, "fetch failed, placeholder text substituted: {}", error)
            }
            ScanWarning::SearchFallback { error } => {
                write!(f, "search failed or empty, fallback documents substituted: {}", error)
            }
            ScanWarning::CompareFallback { doc_title, error } => {
                write!(f, "comparison against '{}' failed, fallback findings substituted: {}", doc_title, error)
            }
            ScanWarning::FeedbackUnavailable { error } => {
                write!(f, "feedback history unavailable, compare ran without context: {}", error)
            }
        }
    }
}

/// The single record threaded through all pipeline stages.
///
/// Each stage writes exactly one field and may read any earlier one; fields
/// are append-only within a run and the whole record is frozen once the run
/// terminates.
pub struct ScanContext {
    pub job: ScanJob,

    // Stage 1 result — guaranteed Some after step_fetch
    pub source_text: Option<String>,

    // Stage 2 result — guaranteed Some after step_search_related
    pub related_docs: Option<Vec<RelatedDoc>>,

    // Stage 3 results
    pub feedback_context: String,
    pub contradictions: Vec<Finding>,

    // Stage 4 result
    pub visual_decays: Vec<Finding>,

    // Stage 5 result
    pub suggestions: Vec<Suggestion>,

    /// Latest stage executed, informational.
    pub current_step: &'static str,

    /// Terminal error, set only on non-recoverable failure.
    pub error: Option<String>,

    /// Non-fatal degradations, in occurrence order.
    pub warnings: Vec<ScanWarning>,
}

impl ScanContext {
    pub fn new(job: ScanJob) -> Self {
        Self {
            job,
            source_text: None,
            related_docs: None,
            feedback_context: String::new(),
            contradictions: Vec::new(),
            visual_decays: Vec::new(),
            suggestions: Vec::new(),
            current_step: "created",
            error: None,
            warnings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Trigger;

    #[test]
    fn test_new_context_has_only_identity() {
        let job = ScanJob::new(
            DocumentRef {
                id: "doc-1".to_string(),
                name: "guide.md".to_string(),
            },
            Trigger::Manual,
        );
        let ctx = ScanContext::new(job);

        assert!(ctx.source_text.is_none());
        assert!(ctx.related_docs.is_none());
        assert!(ctx.contradictions.is_empty());
        assert!(ctx.visual_decays.is_empty());
        assert!(ctx.suggestions.is_empty());
        assert!(ctx.warnings.is_empty());
        assert!(ctx.error.is_none());
        assert_eq!(ctx.current_step, "created");
    }

    #[test]
    fn test_warning_rendering_preserves_error_detail() {
        let warning = ScanWarning::CompareFallback {
            doc_title: "Manual v2.1".to_string(),
            error: "Request timed out: llm".to_string(),
        };
        let rendered = warning.to_string();
        assert!(rendered.contains("Manual v2.1"));
        assert!(rendered.contains("Request timed out"));
        assert!(rendered.contains("fallback findings"));
    }
}
