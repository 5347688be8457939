//! Audit trail of user-visible actions.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feedback::Decision;

/// One auditable action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    /// Dotted action name, e.g. `review.approved`, `scan.execute`.
    pub action: String,
    pub user: String,
    pub resource_type: String,
    pub resource_id: String,
    pub result: String,
    #[serde(default)]
    pub details: HashMap<String, String>,
}

impl AuditEvent {
    pub fn new(action: &str, user: &str, resource_type: &str, resource_id: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            action: action.to_string(),
            user: user.to_string(),
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            result: "success".to_string(),
            details: HashMap::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: &str) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }

    /// A review decision on one issue.
    pub fn review(
        scan_id: &str,
        issue_key: &str,
        decision: Decision,
        reviewer: &str,
        reason: &str,
    ) -> Self {
        Self::new(
            &format!("review.{}", decision),
            reviewer,
            "issue",
            &format!("{}/{}", scan_id, issue_key),
        )
        .with_detail("scan_id", scan_id)
        .with_detail("reason", reason)
    }

    /// A scan execution.
    pub fn scan(scan_id: &str, trigger: &str, user: &str) -> Self {
        Self::new("scan.execute", user, "scan", scan_id).with_detail("trigger", trigger)
    }
}

/// Destination for audit events. Recording must never fail the caller.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Default sink: the local structured log. Every event is at least locally
/// visible even when no durable audit backend is wired up.
#[derive(Debug, Default)]
pub struct LogAudit;

impl AuditSink for LogAudit {
    fn record(&self, event: AuditEvent) {
        log::info!(
            "AUDIT: [{}] user={} resource={}/{} result={}",
            event.action,
            event.user,
            event.resource_type,
            event.resource_id,
            event.result
        );
    }
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct MemoryAudit {
    events: RwLock<Vec<AuditEvent>>,
}

impl MemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.read().expect("audit lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().expect("audit lock poisoned").clone()
    }
}

impl AuditSink for MemoryAudit {
    fn record(&self, event: AuditEvent) {
        self.events
            .write()
            .expect("audit lock poisoned")
            .push(event);
    }
}
