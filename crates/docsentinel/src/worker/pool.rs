use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info};
use tokio::sync::broadcast;

use crate::audit::{AuditEvent, AuditSink};
use crate::dispatch::ChannelDispatcher;
use crate::notify::{Notification, Notifier};
use crate::pipeline::progress::{BroadcastProgress, NoopProgress};
use crate::pipeline::{Detector, ScanContext, ScanProgressEvent};
use crate::store::{ResultStore, ScanRecord};
use crate::worker::job::ScanJob;

/// Thread pool running the detection pipeline over queued scan jobs.
///
/// All workers share one [`Detector`] (and through it the process-wide
/// circuit breakers). Persisting the record, notifying, and auditing happen
/// here at the pipeline boundary, never mid-stage.
pub struct ScanPool {
    job_sender: Sender<ScanJob>,
    result_receiver: Receiver<ScanRecord>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl ScanPool {
    pub fn new(
        detector: Arc<Detector>,
        results: Arc<dyn ResultStore>,
        notifier: Arc<dyn Notifier>,
        audit: Arc<dyn AuditSink>,
        worker_count: usize,
    ) -> Self {
        Self::with_progress_sender(detector, results, notifier, audit, worker_count, None)
    }

    /// Creates a pool with an optional progress broadcaster for streaming.
    ///
    /// # Panics
    /// Panics if `worker_count` is 0.
    pub fn with_progress_sender(
        detector: Arc<Detector>,
        results: Arc<dyn ResultStore>,
        notifier: Arc<dyn Notifier>,
        audit: Arc<dyn AuditSink>,
        worker_count: usize,
        progress_sender: Option<Arc<broadcast::Sender<ScanProgressEvent>>>,
    ) -> Self {
        assert!(worker_count > 0, "worker_count must be > 0");
        let (job_sender, job_receiver) = bounded::<ScanJob>(worker_count * 2);
        let (result_sender, result_receiver) = bounded::<ScanRecord>(worker_count * 2);
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_detector = Arc::clone(&detector);
            let worker_results = Arc::clone(&results);
            let worker_notifier = Arc::clone(&notifier);
            let worker_audit = Arc::clone(&audit);
            let worker_progress = progress_sender.clone();

            let handle = thread::spawn(move || {
                run_worker(
                    worker_id,
                    job_rx,
                    result_tx,
                    shutdown_flag,
                    worker_detector,
                    worker_results,
                    worker_notifier,
                    worker_audit,
                    worker_progress,
                );
            });

            workers.push(handle);
        }

        info!("Started {} scan workers", worker_count);

        Self {
            job_sender,
            result_receiver,
            workers,
            shutdown,
        }
    }

    pub fn submit(&self, job: ScanJob) -> Result<(), crate::error::WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(crate::error::WorkerError::ChannelClosed);
        }

        self.job_sender
            .send(job)
            .map_err(|_| crate::error::WorkerError::ChannelClosed)
    }

    /// A dispatcher feeding this pool, for callers behind the
    /// fire-and-forget enqueue boundary.
    pub fn dispatcher(&self) -> ChannelDispatcher {
        ChannelDispatcher::new(self.job_sender.clone())
    }

    pub fn try_recv_result(&self) -> Option<ScanRecord> {
        self.result_receiver.try_recv().ok()
    }

    pub fn recv_result(&self) -> Option<ScanRecord> {
        self.result_receiver.recv().ok()
    }

    pub fn shutdown(&self) {
        info!("Shutting down scan pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn wait(self) {
        // Drop sender to signal workers to exit
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All scan workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

#[allow(clippy::too_many_arguments)]
fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<ScanJob>,
    result_sender: Sender<ScanRecord>,
    shutdown: Arc<AtomicBool>,
    detector: Arc<Detector>,
    results: Arc<dyn ResultStore>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditSink>,
    progress_sender: Option<Arc<broadcast::Sender<ScanProgressEvent>>>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(std::time::Duration::from_millis(100)) {
            Ok(job) => {
                debug!("Worker {} scanning: {}", worker_id, job.doc.name);
                audit.record(AuditEvent::scan(
                    &job.scan_id,
                    &job.trigger.to_string(),
                    "system",
                ));

                let record = if let Some(ref sender) = progress_sender {
                    let progress =
                        BroadcastProgress::new(&job.scan_id, &job.doc.name, Arc::clone(sender));
                    let ctx = ScanContext::new(job);
                    let (record, _ctx) = detector.run(ctx, &progress);
                    record
                } else {
                    let ctx = ScanContext::new(job);
                    let (record, _ctx) = detector.run(ctx, &NoopProgress);
                    record
                };

                // Persistence is best-effort: a down result store must not
                // lose the in-flight record for the caller.
                if let Err(e) = results.save(&record) {
                    log::warn!("Result save failed for {}: {}", record.scan_id, e);
                }

                let notification = Notification::from_record(&record);
                notifier.scan_complete(&notification);
                if notification.is_critical() {
                    notifier.critical_alert(&notification);
                }

                if let Err(e) = result_sender.send(record) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}
