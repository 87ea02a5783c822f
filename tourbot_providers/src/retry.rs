use std::fmt::Display;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Run an async operation, retrying after each delay in `delays` on failure.
///
/// The operation is attempted `delays.len() + 1` times at most; an empty
/// `delays` means a single attempt. The last error is returned when every
/// attempt fails.
pub async fn retry_with_backoff<F, Fut, T, E>(mut operation: F, delays: &[Duration]) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = delays.len() + 1;
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                let Some(delay) = delays.get(attempt - 1) else {
                    return Err(e);
                };
                warn!(
                    "Request failed (attempt {attempt}/{attempts}): {e}. Retrying after {}ms...",
                    delay.as_millis()
                );
                sleep(*delay).await;
                attempt += 1;
            }
        }
    }
}
