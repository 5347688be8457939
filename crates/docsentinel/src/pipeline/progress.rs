//! Per-stage progress reporting for live scan streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Phase of a scan run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    Queued,
    FetchSource,
    SearchRelated,
    CompareText,
    CompareImages,
    Suggest,
    Completed,
    Failed,
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanPhase::Queued => write!(f, "Queued"),
            ScanPhase::FetchSource => write!(f, "Fetching source"),
            ScanPhase::SearchRelated => write!(f, "Searching related documents"),
            ScanPhase::CompareText => write!(f, "Comparing text"),
            ScanPhase::CompareImages => write!(f, "Checking screenshots"),
            ScanPhase::Suggest => write!(f, "Generating suggestions"),
            ScanPhase::Completed => write!(f, "Completed"),
            ScanPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Progress events emitted by the pipeline.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Phase { phase: ScanPhase, message: String },
    Completed { issue_count: usize },
    Failed { error: String },
}

/// Serializable event published to streaming consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgressEvent {
    pub scan_id: String,
    pub doc_name: String,
    pub phase: ScanPhase,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Sink for pipeline progress. Reporting must never fail the run.
pub trait ProgressReporter {
    fn report(&self, event: ProgressEvent);
}

/// Reporter that discards everything.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Reporter publishing over a broadcast channel for live consumers.
pub struct BroadcastProgress {
    scan_id: String,
    doc_name: String,
    sender: Arc<broadcast::Sender<ScanProgressEvent>>,
}

impl BroadcastProgress {
    pub fn new(
        scan_id: &str,
        doc_name: &str,
        sender: Arc<broadcast::Sender<ScanProgressEvent>>,
    ) -> Self {
        Self {
            scan_id: scan_id.to_string(),
            doc_name: doc_name.to_string(),
            sender,
        }
    }

    fn publish(&self, phase: ScanPhase, message: String, issue_count: Option<usize>, error: Option<String>) {
        let event = ScanProgressEvent {
            scan_id: self.scan_id.clone(),
            doc_name: self.doc_name.clone(),
            phase,
            message,
            timestamp: Utc::now(),
            issue_count,
            error,
        };
        // No receivers is normal when nobody is watching the stream.
        if let Err(e) = self.sender.send(event) {
            log::debug!("No progress listeners active: {}", e);
        }
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Phase { phase, message } => self.publish(phase, message, None, None),
            ProgressEvent::Completed { issue_count } => self.publish(
                ScanPhase::Completed,
                format!("Scan completed with {} issue(s)", issue_count),
                Some(issue_count),
                None,
            ),
            ProgressEvent::Failed { error } => {
                self.publish(ScanPhase::Failed, "Scan failed".to_string(), None, Some(error))
            }
        }
    }
}
