//! Notifications published at pipeline boundaries.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::finding::Severity;
use crate::store::ScanRecord;

/// Outbound notification payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub scan_id: String,
    pub doc_name: String,
    pub issue_count: usize,
    pub critical_count: usize,
}

impl Notification {
    pub fn from_record(record: &ScanRecord) -> Self {
        Self {
            scan_id: record.scan_id.clone(),
            doc_name: record.doc_name.clone(),
            issue_count: record.issue_count(),
            critical_count: record
                .issues()
                .filter(|f| f.severity == Severity::Critical)
                .count(),
        }
    }

    /// Critical findings warrant an alert, not just a completion event.
    pub fn is_critical(&self) -> bool {
        self.critical_count > 0
    }
}

/// Publishes scan lifecycle events. Publishing is best-effort by contract:
/// implementations must not propagate delivery failures to the pipeline.
pub trait Notifier: Send + Sync {
    fn scan_complete(&self, notification: &Notification);

    fn critical_alert(&self, notification: &Notification);
}

/// Default notifier: the local log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn scan_complete(&self, notification: &Notification) {
        log::info!(
            "Scan {} complete: {} issue(s) in '{}'",
            notification.scan_id,
            notification.issue_count,
            notification.doc_name
        );
    }

    fn critical_alert(&self, notification: &Notification) {
        log::warn!(
            "Critical findings in '{}': {} of {} issue(s) (scan {})",
            notification.doc_name,
            notification.critical_count,
            notification.issue_count,
            notification.scan_id
        );
    }
}

/// Capturing notifier for tests.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    completed: RwLock<Vec<Notification>>,
    alerts: RwLock<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> Vec<Notification> {
        self.completed.read().expect("notify lock poisoned").clone()
    }

    pub fn alerts(&self) -> Vec<Notification> {
        self.alerts.read().expect("notify lock poisoned").clone()
    }
}

impl Notifier for MemoryNotifier {
    fn scan_complete(&self, notification: &Notification) {
        self.completed
            .write()
            .expect("notify lock poisoned")
            .push(notification.clone());
    }

    fn critical_alert(&self, notification: &Notification) {
        self.alerts
            .write()
            .expect("notify lock poisoned")
            .push(notification.clone());
    }
}
