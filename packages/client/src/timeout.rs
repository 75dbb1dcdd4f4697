//! Per-hop timeout control.
//!
//! One single-shot timer per hop. Re-arming on a redirect means calling
//! [`TimeoutController::limit`] again with the next hop's future: the
//! previous timer is gone with the previous call, so two can never run
//! concurrently.

use std::future::Future;
use std::time::Duration;

use crate::error::NetworkError;

/// Single-shot timer bound to one hop of a request.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutController {
    duration: Duration,
}

impl TimeoutController {
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// Run one hop under the timeout. Expiry drops the hop future (which
    /// cancels the open connection) and reports a connection failure.
    pub async fn limit<T, F>(&self, hop: F) -> Result<T, NetworkError>
    where
        F: Future<Output = T>,
    {
        match tokio::time::timeout(self.duration, hop).await {
            Ok(value) => Ok(value),
            Err(_) => Err(NetworkError::ConnectionFailed(
                "Connection timed out".to_string(),
            )),
        }
    }
}
