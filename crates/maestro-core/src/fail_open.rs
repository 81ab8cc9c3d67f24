//! Fail-open helpers for side effects that must never break a run
//!
//! Appropriate for the activity log and for provisioning built-in workers
//! into a registry. Never use these for step invocation: step failures are
//! recorded on the owning phase result instead.

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Run an infrastructure operation, logging and swallowing its error
///
/// Returns `None` when the operation failed.
///
/// ```no_run
/// use maestro_core::fail_open::fail_open;
/// use maestro_core::Result;
///
/// async fn append_log() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let written = fail_open("activity_log", || append_log()).await;
///     assert!(written.is_some());
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
            warn!(operation = operation_name, error = %e, "operation failed (fail-open)");
            None
        }
    }
}
