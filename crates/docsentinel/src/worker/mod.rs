pub mod job;
pub mod pool;
pub mod scanner;

pub use job::{new_scan_id, ScanJob};
pub use pool::ScanPool;
pub use scanner::InboxScanner;
