//! Context enrichment: renders recent review history into a bounded digest
//! for injection into detection prompts.

use std::fmt::Write;

use crate::error::StoreError;
use crate::feedback::{Decision, FeedbackEntry, FeedbackStore};
use crate::llm::prompt::truncate_chars;

/// Builds the feedback digest consumed by the compare-text stage.
///
/// Every free-text field is truncated to a fixed character budget so the
/// digest stays safe to embed in a prompt regardless of history size.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    limit: usize,
    category: Option<String>,
    detail_budget: usize,
}

impl ContextBuilder {
    pub fn new(limit: usize, detail_budget: usize) -> Self {
        Self {
            limit,
            category: None,
            detail_budget,
        }
    }

    /// Restricts the digest to one finding category.
    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    /// Fetches recent entries and renders the digest.
    ///
    /// No entries means no context: an empty string, not an error.
    pub fn build(&self, store: &dyn FeedbackStore) -> Result<String, StoreError> {
        let entries = store.query_recent(self.category.as_deref(), self.limit)?;
        Ok(self.render(&entries))
    }

    /// Renders already-fetched entries, partitioned into confirmed real
    /// issues and confirmed false positives.
    pub fn render(&self, entries: &[FeedbackEntry]) -> String {
        if entries.is_empty() {
            return String::new();
        }

        let approved: Vec<&FeedbackEntry> = entries
            .iter()
            .filter(|e| e.decision == Decision::Approved)
            .collect();
        let denied: Vec<&FeedbackEntry> = entries
            .iter()
            .filter(|e| e.decision == Decision::Denied)
            .collect();

        let mut out = String::new();

        if !approved.is_empty() {
            out.push_str("Confirmed real issues (approved by reviewers):\n");
            for entry in &approved {
                let _ = writeln!(
                    out,
                    "- [{}/{}] {}",
                    entry.category,
                    entry.severity,
                    truncate_chars(&entry.detail, self.detail_budget)
                );
            }
        }

        if !denied.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("Confirmed false positives (denied by reviewers):\n");
            for entry in &denied {
                if entry.reason.is_empty() {
                    let _ = writeln!(
                        out,
                        "- [{}/{}] {}",
                        entry.category,
                        entry.severity,
                        truncate_chars(&entry.detail, self.detail_budget)
                    );
                } else {
                    let _ = writeln!(
                        out,
                        "- [{}/{}] denied as \"{}\": {}",
                        entry.category,
                        entry.severity,
                        truncate_chars(&entry.reason, self.detail_budget),
                        truncate_chars(&entry.detail, self.detail_budget)
                    );
                }
            }
        }

        out
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(20, 80)
    }
}
