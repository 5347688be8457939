//! Human review of findings and the decision → feedback bridge.

pub mod health;

pub use health::health_score;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{AuditEvent, AuditSink};
use crate::feedback::{Decision, FeedbackEntry, FeedbackStore};
use crate::finding::Finding;

/// Builds the review key for the issue at `ordinal` within a scan.
///
/// Ordinals run over contradictions first, then visual decays (see
/// [`crate::store::ScanRecord::issues`]).
pub fn issue_key(scan_id: &str, ordinal: usize) -> String {
    format!("{}_issue_{}", scan_id, ordinal)
}

/// One live review decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDecision {
    pub decision: Decision,
    #[serde(default)]
    pub reason: String,
    pub reviewer: String,
    pub timestamp: DateTime<Utc>,
}

/// Live mapping from issue key to the current decision.
///
/// Last-write-wins per key with no further concurrency control: concurrent
/// reviewers overwriting the same key is an accepted race. Overwriting the
/// live status never retracts feedback entries already persisted.
#[derive(Debug, Default)]
pub struct ReviewState {
    decisions: HashMap<String, ReviewDecision>,
}

impl ReviewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: &str, decision: ReviewDecision) {
        self.decisions.insert(key.to_string(), decision);
    }

    pub fn get(&self, key: &str) -> Option<&ReviewDecision> {
        self.decisions.get(key)
    }

    /// Whether the issue has any decision (either verdict resolves it for
    /// health-scoring purposes).
    pub fn is_reviewed(&self, key: &str) -> bool {
        self.decisions.contains_key(key)
    }

    pub fn reviewed_count(&self) -> usize {
        self.decisions.len()
    }
}

/// The review boundary: accepts decisions, keeps the live state, and feeds
/// the learning loop.
///
/// Persisting feedback is fire-and-forget by policy: review must never fail
/// or block because the learning sink is down, so a store error is logged
/// and dropped while the live decision stands.
pub struct ReviewDesk {
    state: ReviewState,
    feedback: Arc<dyn FeedbackStore>,
    audit: Arc<dyn AuditSink>,
}

impl ReviewDesk {
    pub fn new(feedback: Arc<dyn FeedbackStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            state: ReviewState::new(),
            feedback,
            audit,
        }
    }

    /// Records a reviewer's verdict on one finding of one scan.
    pub fn record(
        &mut self,
        scan_id: &str,
        ordinal: usize,
        finding: &Finding,
        decision: Decision,
        reason: &str,
        reviewer: &str,
    ) {
        let key = issue_key(scan_id, ordinal);
        let now = Utc::now();

        self.state.record(
            &key,
            ReviewDecision {
                decision,
                reason: reason.to_string(),
                reviewer: reviewer.to_string(),
                timestamp: now,
            },
        );

        let entry = FeedbackEntry {
            scan_id: scan_id.to_string(),
            issue_key: key.clone(),
            decision,
            category: finding.category.clone(),
            severity: finding.severity.to_string(),
            detail: finding.message.clone(),
            suggestion: finding.suggestion.clone(),
            reason: reason.to_string(),
            reviewer: reviewer.to_string(),
            timestamp: now,
        };
        if let Err(e) = self.feedback.append(entry) {
            log::warn!("Feedback save failed for {}: {} (decision kept)", key, e);
        }

        self.audit.record(AuditEvent::review(
            scan_id, &key, decision, reviewer, reason,
        ));
    }

    pub fn state(&self) -> &ReviewState {
        &self.state
    }
}
