use chrono::{DateTime, Utc};

use crate::pipeline::context::DocumentRef;
use crate::store::Trigger;

/// Builds a scan identifier: timestamp prefix for operators, uuid fragment
/// so two scans inside one second cannot collide.
pub fn new_scan_id(now: DateTime<Utc>) -> String {
    let fragment = uuid::Uuid::new_v4().simple().to_string();
    format!("scan_{}_{}", now.format("%Y%m%d_%H%M%S"), &fragment[..8])
}

/// One queued scan of one document.
#[derive(Debug, Clone)]
pub struct ScanJob {
    pub id: String,
    pub scan_id: String,
    pub doc: DocumentRef,
    pub trigger: Trigger,
    /// MIME type guessed from the document name, when recognizable.
    pub mime_type: Option<String>,
    pub queued_at: DateTime<Utc>,
}

impl ScanJob {
    pub fn new(doc: DocumentRef, trigger: Trigger) -> Self {
        let now = Utc::now();
        let mime_type = mime_guess::from_path(&doc.name).first().map(|m| m.to_string());
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            scan_id: new_scan_id(now),
            doc,
            trigger,
            mime_type,
            queued_at: now,
        }
    }
}
