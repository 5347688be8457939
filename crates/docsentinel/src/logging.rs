//! Logging/tracing initialization for the host process.

use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber and bridges `log` records into it.
///
/// The filter comes from `LOG_LEVEL` (falling back to `info`); `RUST_LOG`
/// syntax is accepted for per-module overrides. Safe to call once per
/// process; later calls are ignored.
pub fn init_logging() {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_log::LogTracer::init();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        log::debug!("Logging already initialized, keeping existing subscriber");
    }
}
