use std::time::Duration;

use tokio::time::{Instant, sleep};

/// Default upper bound of [`wait_until`].
///
/// Conditions awaited by tests are reached within milliseconds, the bound only turns a hang into
/// a failure.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polls `condition` until it holds.
///
/// # Panics
///
/// Panics if the condition does not hold within [`DEFAULT_WAIT_TIMEOUT`].
pub async fn wait_until<F>(description: &str, condition: F)
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + DEFAULT_WAIT_TIMEOUT;

    while !condition() {
        if Instant::now() >= deadline {
            panic!(
                "Condition `{description}` not reached after {DEFAULT_WAIT_TIMEOUT:?}. \
                 Check whether the awaited state is reachable."
            );
        }
        sleep(POLL_INTERVAL).await;
    }
}
