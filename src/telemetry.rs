//! Tracing initialization for binaries and integration harnesses.

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG`; defaults to `info`. Safe to call once per process.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}
