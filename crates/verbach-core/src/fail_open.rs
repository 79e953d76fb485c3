//! Fail-open utilities for best-effort side work
//!
//! Diagnostic captures and session teardown must never turn a lookup's real
//! outcome into a different error. Those operations go through [`fail_open`].
//!
//! DO NOT use fail-open for:
//! - Navigation, form filling or the result wait
//! - Text extraction
//! - PDF rendering (a validated lookup without its artifact is an error)

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Execute an operation whose failure is only worth a warning
///
/// Logs the error via `tracing::warn!` on failure and returns `None`.
///
/// # Usage
///
/// ```no_run
/// use verbach_core::fail_open::fail_open;
/// use verbach_core::Result;
///
/// async fn capture_debug_screenshot() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let captured = fail_open("debug_screenshot", || capture_debug_screenshot()).await;
///     // captured is None if the capture failed, otherwise Some(())
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}
