//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::{CadenceError, Result};

/// Wrap a fallible future with a deadline.
///
/// On expiry the future is dropped, so in-flight capability calls are
/// abandoned rather than awaited.
pub async fn with_timeout<T>(duration: Duration, future: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(CadenceError::Timeout(duration.as_millis() as u64)),
    }
}
