//! Corpus health scoring over scan history.

use serde::{Deserialize, Serialize};

use crate::review::{issue_key, ReviewState};
use crate::store::ScanRecord;

/// Whether a document's findings can be fixed in place or only flagged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FixMode {
    /// Editable source format; suggested fixes can be applied directly.
    AutoFixed,
    /// Rendered/binary format; a human must update the source.
    ManualAlert,
}

const EDITABLE_EXTENSIONS: &[&str] = &["docx", "txt", "md", "html"];

/// Classifies a document by filename extension.
///
/// Unknown extensions default to auto-fixed, matching the optimistic
/// treatment of plain-text-ish formats.
pub fn fix_mode_for(file_name: &str) -> FixMode {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if EDITABLE_EXTENSIONS.contains(&ext.as_str()) {
        FixMode::AutoFixed
    } else if matches!(ext.as_str(), "pdf" | "png" | "jpg" | "jpeg") {
        FixMode::ManualAlert
    } else {
        FixMode::AutoFixed
    }
}

/// Computes the 0–100 document health score over recent scan history.
///
/// Each unreviewed finding subtracts its severity weight from a base of 100;
/// a finding with any review decision counts as resolved and costs nothing.
pub fn health_score(history: &[ScanRecord], review: &ReviewState) -> u32 {
    let base: u32 = 100;
    let mut penalty: u32 = 0;

    for scan in history {
        for (ordinal, finding) in scan.issues().enumerate() {
            let key = issue_key(&scan.scan_id, ordinal);
            if review.is_reviewed(&key) {
                continue;
            }
            penalty = penalty.saturating_add(finding.severity.weight());
        }
    }

    base.saturating_sub(penalty)
}
