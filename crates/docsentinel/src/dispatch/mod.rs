//! Asynchronous scan dispatch.
//!
//! The queue is an external collaborator with at-least-once delivery and no
//! ordering guarantee; enqueue is fire-and-forget. A failed enqueue returns
//! `None` rather than an error so callers can fall back to running the scan
//! synchronously.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::context::DocumentRef;
use crate::store::Trigger;
use crate::worker::job::ScanJob;

/// Payload describing one requested scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub doc: DocumentRef,
    pub trigger: Trigger,
    pub queued_at: DateTime<Utc>,
}

impl ScanRequest {
    pub fn new(doc: DocumentRef, trigger: Trigger) -> Self {
        Self {
            doc,
            trigger,
            queued_at: Utc::now(),
        }
    }
}

/// Opaque handle for an accepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle(pub String);

/// Hands scan requests to the execution backend.
pub trait Dispatcher: Send + Sync {
    /// Returns a handle when the request was accepted, `None` when the queue
    /// is unavailable. Never blocks on queue latency beyond the send itself.
    fn enqueue(&self, request: ScanRequest) -> Option<TaskHandle>;
}

/// [`Dispatcher`] feeding the in-process worker pool over a bounded channel.
pub struct ChannelDispatcher {
    sender: crossbeam_channel::Sender<ScanJob>,
}

impl ChannelDispatcher {
    pub fn new(sender: crossbeam_channel::Sender<ScanJob>) -> Self {
        Self { sender }
    }
}

impl Dispatcher for ChannelDispatcher {
    fn enqueue(&self, request: ScanRequest) -> Option<TaskHandle> {
        let job = ScanJob::new(request.doc, request.trigger);
        let handle = TaskHandle(job.scan_id.clone());
        match self.sender.send(job) {
            Ok(()) => {
                log::info!("Enqueued scan {} ({})", handle.0, request.trigger);
                Some(handle)
            }
            Err(e) => {
                log::warn!("Scan queue unavailable, request dropped: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> DocumentRef {
        DocumentRef {
            id: "docs/guide.md".to_string(),
            name: "guide.md".to_string(),
        }
    }

    #[test]
    fn test_enqueue_returns_handle_and_delivers_job() {
        let (tx, rx) = crossbeam_channel::bounded(4);
        let dispatcher = ChannelDispatcher::new(tx);

        let handle = dispatcher.enqueue(ScanRequest::new(doc(), Trigger::Upload)).unwrap();
        assert!(handle.0.starts_with("scan_"));

        let job = rx.try_recv().unwrap();
        assert_eq!(job.scan_id, handle.0);
        assert_eq!(job.trigger, Trigger::Upload);
        assert_eq!(job.doc.name, "guide.md");
    }

    #[test]
    fn test_enqueue_on_closed_queue_returns_none() {
        let (tx, rx) = crossbeam_channel::bounded(4);
        drop(rx);
        let dispatcher = ChannelDispatcher::new(tx);

        assert!(dispatcher.enqueue(ScanRequest::new(doc(), Trigger::Manual)).is_none());
    }

    #[test]
    fn test_request_serializes() {
        let request = ScanRequest::new(doc(), Trigger::Scheduled);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["trigger"], "scheduled");
        assert_eq!(json["doc"]["name"], "guide.md");
        assert!(json.get("queuedAt").is_some());
    }
}
