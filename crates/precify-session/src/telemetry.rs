//! Logging setup for embedding applications.
//!
//! Called once at startup by whatever hosts the session (CLI, desktop shell,
//! service). Library code only ever emits through `tracing`; the subscriber
//! is the host's choice, and this is just the sensible default.

use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// ## Filter
/// - Respects `RUST_LOG` when set
/// - Default: INFO everywhere, DEBUG for the precify crates
///
/// Safe to call once; a second call is a no-op rather than a panic, so tests
/// that share a process can all ask for logging.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,precify=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
