//! Durable reviewer feedback: the learning signal behind detection accuracy.

pub mod context;

pub use context::ContextBuilder;

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A reviewer's verdict on one finding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Denied,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Approved => write!(f, "approved"),
            Decision::Denied => write!(f, "denied"),
        }
    }
}

/// One persisted review outcome.
///
/// Append-only training signal: entries are never edited or deleted once
/// written. Re-persisting the same `issue_key` (a retried write, or a
/// reviewer flipping their live decision) overwrites idempotently in the
/// store without retracting what was already learned elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub scan_id: String,
    /// `"{scan_id}_issue_{ordinal}"`.
    pub issue_key: String,
    pub decision: Decision,
    pub category: String,
    pub severity: String,
    /// Full text of the finding the reviewer judged.
    pub detail: String,
    #[serde(default)]
    pub suggestion: String,
    /// Reviewer's stated reason, possibly empty.
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub reviewer: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only log of review decisions, queryable by recency and category.
pub trait FeedbackStore: Send + Sync {
    fn append(&self, entry: FeedbackEntry) -> Result<(), StoreError>;

    /// Most recent entries first, optionally filtered by category.
    fn query_recent(
        &self,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<FeedbackEntry>, StoreError>;
}

/// In-process [`FeedbackStore`] for tests and single-run usage.
#[derive(Debug, Default)]
pub struct MemoryFeedbackStore {
    entries: RwLock<Vec<FeedbackEntry>>,
}

impl MemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("feedback lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FeedbackStore for MemoryFeedbackStore {
    fn append(&self, entry: FeedbackEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.write().expect("feedback lock poisoned");
        // Same key overwrites in place; the slot keeps its history position.
        if let Some(existing) = entries.iter_mut().find(|e| e.issue_key == entry.issue_key) {
            *existing = entry;
        } else {
            entries.push(entry);
        }
        Ok(())
    }

    fn query_recent(
        &self,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<FeedbackEntry>, StoreError> {
        let entries = self.entries.read().expect("feedback lock poisoned");
        let mut recent: Vec<FeedbackEntry> = entries
            .iter()
            .filter(|e| category.map(|c| e.category == c).unwrap_or(true))
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent.truncate(limit);
        Ok(recent)
    }
}

#[cfg(test)]
pub(crate) fn entry_fixture(key: &str, decision: Decision, category: &str) -> FeedbackEntry {
    FeedbackEntry {
        scan_id: "scan_20260715_120000".to_string(),
        issue_key: key.to_string(),
        decision,
        category: category.to_string(),
        severity: "warning".to_string(),
        detail: format!("detail for {}", key),
        suggestion: String::new(),
        reason: String::new(),
        reviewer: "admin".to_string(),
        timestamp: Utc::now(),
    }
}
