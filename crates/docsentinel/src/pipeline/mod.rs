pub mod context;
pub mod progress;
pub mod runner;

pub use context::{DocumentRef, ScanContext, ScanWarning};
pub use progress::{
    BroadcastProgress, NoopProgress, ProgressEvent, ProgressReporter, ScanPhase, ScanProgressEvent,
};
pub use runner::Detector;
