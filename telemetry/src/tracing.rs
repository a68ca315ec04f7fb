//! Tracing initialization shared by coordinator processes and tests.

use std::sync::Once;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "info";

static INIT_TEST_TRACING: Once = Once::new();

/// Flushes buffered log lines when dropped.
///
/// Keep it alive for as long as the process logs, dropping it early loses log lines written
/// through the non-blocking writer.
#[must_use = "dropping the flusher stops log output"]
pub struct LogFlusher {
    _guard: WorkerGuard,
}

/// Installs the global subscriber for a coordinator process.
///
/// Logs go to stdout through a non-blocking writer, filtered by `RUST_LOG` or
/// [`DEFAULT_LOG_FILTER`]. Every event carries the `app` field with `app_name`.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_thread_names(true)
                .with_target(true),
        )
        .try_init()?;

    tracing::info!(app = app_name, "tracing initialized");

    Ok(LogFlusher { _guard: guard })
}

/// Installs a test subscriber once per test binary.
///
/// Output is captured by the test harness and only printed for failing tests. Set `RUST_LOG`
/// to raise verbosity.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
