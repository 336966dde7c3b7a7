//! Timeout enforcement.
//!
//! Every external call gets a deadline. Expiry surfaces as an
//! [`UpstreamKind::Timeout`] failure, distinct from transport errors.

use std::future::Future;
use std::time::Duration;

use crate::analysis::{UpstreamError, UpstreamKind};

/// Run `future` with a deadline; `operation` names it in the failure detail.
pub async fn with_deadline<F, T>(
    deadline: Duration,
    operation: &str,
    future: F,
) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    match tokio::time::timeout(deadline, future).await {
        Ok(result) => result,
        Err(_) => Err(UpstreamError::new(
            UpstreamKind::Timeout,
            format!("{operation} timed out after {}s", deadline.as_secs_f64()),
        )),
    }
}
