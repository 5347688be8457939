//! Scan-result persistence.

pub mod sqlite;

pub use sqlite::SqliteStore;

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::finding::{Finding, Suggestion};

/// What started a scan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Manual,
    Upload,
    Scheduled,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Manual => write!(f, "manual"),
            Trigger::Upload => write!(f, "upload"),
            Trigger::Scheduled => write!(f, "scheduled"),
        }
    }
}

/// Terminal state of a scan run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// All five stages ran; some may have substituted fallback data.
    Completed,
    /// A non-recoverable error outside the stage fallback paths.
    Failed,
}

/// The persisted outcome of one pipeline run.
///
/// Immutable once written; the pipeline's in-flight context is discarded
/// after this record is saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub scan_id: String,
    pub doc_id: String,
    pub doc_name: String,
    pub trigger: Trigger,
    pub status: ScanStatus,
    pub contradictions: Vec<Finding>,
    pub visual_decays: Vec<Finding>,
    pub suggestions: Vec<Suggestion>,
    /// Rendered degradation warnings; provenance trail for substituted data.
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub triggered_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl ScanRecord {
    pub fn issue_count(&self) -> usize {
        self.contradictions.len() + self.visual_decays.len()
    }

    /// Findings in review ordinal order: contradictions first, then visual
    /// decays. Issue keys index into this sequence.
    pub fn issues(&self) -> impl Iterator<Item = &Finding> {
        self.contradictions.iter().chain(self.visual_decays.iter())
    }
}

/// Store of scan outcomes consumed by review and health scoring.
pub trait ResultStore: Send + Sync {
    fn save(&self, record: &ScanRecord) -> Result<(), StoreError>;

    /// Most recent records first.
    fn get_recent(&self, limit: usize) -> Result<Vec<ScanRecord>, StoreError>;

    fn get(&self, scan_id: &str) -> Result<Option<ScanRecord>, StoreError>;

    fn delete(&self, scan_id: &str) -> Result<bool, StoreError>;
}

/// In-process [`ResultStore`] for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    records: RwLock<HashMap<String, ScanRecord>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultStore for MemoryResultStore {
    fn save(&self, record: &ScanRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .expect("result lock poisoned")
            .insert(record.scan_id.clone(), record.clone());
        Ok(())
    }

    fn get_recent(&self, limit: usize) -> Result<Vec<ScanRecord>, StoreError> {
        let records = self.records.read().expect("result lock poisoned");
        let mut recent: Vec<ScanRecord> = records.values().cloned().collect();
        recent.sort_by(|a, b| b.triggered_at.cmp(&a.triggered_at));
        recent.truncate(limit);
        Ok(recent)
    }

    fn get(&self, scan_id: &str) -> Result<Option<ScanRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .expect("result lock poisoned")
            .get(scan_id)
            .cloned())
    }

    fn delete(&self, scan_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .records
            .write()
            .expect("result lock poisoned")
            .remove(scan_id)
            .is_some())
    }
}

#[cfg(test)]
pub(crate) fn record_fixture(scan_id: &str) -> ScanRecord {
    use crate::finding::{FindingKind, Provenance, Severity};

    ScanRecord {
        scan_id: scan_id.to_string(),
        doc_id: "doc-1".to_string(),
        doc_name: "Operations_Manual.md".to_string(),
        trigger: Trigger::Manual,
        status: ScanStatus::Completed,
        contradictions: vec![Finding {
            kind: FindingKind::Contradiction,
            category: "Navigation procedure".to_string(),
            severity: Severity::Critical,
            message: "Settings moved".to_string(),
            suggestion: "Update the steps".to_string(),
            old_text: None,
            new_text: None,
            source_doc: "Manual v2.1".to_string(),
            doc_id: "doc-2".to_string(),
            provenance: Provenance::Model,
        }],
        visual_decays: vec![],
        suggestions: vec![],
        warnings: vec![],
        error: None,
        triggered_at: Utc::now(),
        completed_at: Utc::now(),
    }
}
