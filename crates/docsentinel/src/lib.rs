pub mod audit;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod feedback;
pub mod finding;
pub mod llm;
pub mod logging;
pub mod notify;
pub mod pipeline;
pub mod resilience;
pub mod review;
pub mod search;
pub mod source;
pub mod store;
pub mod worker;

pub use audit::{AuditEvent, AuditSink, LogAudit};
pub use config::{load_config, Config};
pub use dispatch::{ChannelDispatcher, Dispatcher, ScanRequest, TaskHandle};
pub use error::{CollabError, ConfigError, Result, SentinelError, StoreError, WorkerError};
pub use feedback::{ContextBuilder, Decision, FeedbackEntry, FeedbackStore, MemoryFeedbackStore};
pub use finding::{Finding, FindingKind, Provenance, Severity, Suggestion, SuggestionStatus};
pub use llm::{HttpComparer, TextComparer};
pub use logging::init_logging;
pub use notify::{LogNotifier, Notification, Notifier};
pub use pipeline::{Detector, DocumentRef, NoopProgress, ScanContext, ScanWarning};
pub use resilience::{CircuitBreaker, CircuitState, GuardError, RetryPolicy, SharedBreakers};
pub use review::{health_score, issue_key, ReviewDecision, ReviewDesk, ReviewState};
pub use search::{HttpSearch, RelatedDoc, RelatedDocSearch};
pub use source::{DocumentSource, FileSource};
pub use store::{MemoryResultStore, ResultStore, ScanRecord, ScanStatus, SqliteStore, Trigger};
pub use worker::{InboxScanner, ScanJob, ScanPool};
