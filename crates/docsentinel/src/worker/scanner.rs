//! Inbox directory scanner: the upload trigger for automatic scans.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::dispatch::{Dispatcher, ScanRequest};
use crate::error::WorkerError;
use crate::pipeline::context::DocumentRef;
use crate::store::Trigger;

/// Extensions treated as scannable documents; everything else is skipped.
const DOCUMENT_EXTENSIONS: &[&str] = &["docx", "doc", "pdf", "txt", "md", "html"];

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| DOCUMENT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Sweeps an inbox directory and enqueues a scan for every document not seen
/// on a previous sweep.
///
/// Polling is the trigger mechanism: the scanner is meant to run repeatedly
/// (a poll loop or a scheduler tick), and it keeps the set of already
/// enqueued paths so a document is dispatched once per appearance.
pub struct InboxScanner {
    root: PathBuf,
    seen: HashSet<PathBuf>,
}

impl InboxScanner {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            seen: HashSet::new(),
        }
    }

    /// One sweep: walk the inbox, enqueue new documents, return how many
    /// scans were dispatched.
    pub fn sweep(&mut self, dispatcher: &dyn Dispatcher) -> Result<usize, WorkerError> {
        let mut dispatched = 0;

        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|e| WorkerError::ScanFailed {
                path: self.root.clone(),
                source: e,
            })?;

            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !is_document(path) {
                log::debug!("Skipping non-document file: {}", path.display());
                continue;
            }
            if self.seen.contains(path) {
                continue;
            }

            let relative = path
                .strip_prefix(&self.root)
                .unwrap_or(path)
                .to_string_lossy()
                .to_string();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| relative.clone());

            let request = ScanRequest::new(
                DocumentRef { id: relative, name },
                Trigger::Upload,
            );

            if dispatcher.enqueue(request).is_some() {
                self.seen.insert(path.to_path_buf());
                dispatched += 1;
            }
        }

        if dispatched > 0 {
            log::info!("Inbox sweep dispatched {} scan(s)", dispatched);
        }
        Ok(dispatched)
    }
}
