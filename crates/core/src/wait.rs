use std::future::Future;
use std::time::{Duration, Instant};

use crate::error::FlowError;

/// Bounded cooperative polling: call `probe` until it yields a value or the
/// timeout elapses. Used for both inbox polling and DOM-condition waits so
/// the two share identical timeout semantics.
///
/// A probe error ends the wait immediately (transport failures are not
/// retried silently; the caller decides). Expiry fails only this wait, as
/// `FlowError::Timeout` naming `what` was being waited for.
pub async fn wait_until<F, Fut, T>(
    what: &str,
    timeout: Duration,
    poll_interval: Duration,
    mut probe: F,
) -> Result<T, FlowError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, FlowError>>,
{
    let started = Instant::now();
    loop {
        if let Some(value) = probe().await? {
            return Ok(value);
        }
        if started.elapsed() >= timeout {
            return Err(FlowError::timeout(
                what,
                started.elapsed().as_millis() as u64,
            ));
        }
        tokio::time::sleep(poll_interval).await;
    }
}
