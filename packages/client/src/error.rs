//! Error types produced while driving a verification request.
//!
//! Every transport, timeout and path-monitor failure is folded into
//! [`NetworkError`] and delivered through the single completion path of the
//! connection manager. Nothing here is ever propagated as a panic.

use thiserror::Error;

/// Terminal failure of one logical request.
///
/// Producing one of these always ends the request; the orchestrator maps it
/// into the boundary result shape (see [`crate::outcome`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// A 3xx response carried no usable `Location` target.
    #[error("{0}")]
    InvalidRedirectUrl(String),

    /// The redirect chain exceeded the configured hop bound.
    #[error("Too many redirects")]
    TooManyRedirects,

    /// The connection was established but the exchange failed, or it timed out.
    #[error("{0}")]
    ConnectionFailed(String),

    /// The connection could not be created at all (bad scheme, empty host,
    /// socket configuration failure).
    #[error("{0}")]
    ConnectionCantBeCreated(String),

    /// The required network path class is not usable.
    #[error("{0}")]
    PathUnavailable(String),

    /// Anything else: malformed responses, missing URL parts, command
    /// composition failures.
    #[error("{0}")]
    Other(String),
}

impl NetworkError {
    /// The stable error key reported at the result boundary.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            NetworkError::InvalidRedirectUrl(_) | NetworkError::TooManyRedirects => {
                "sdk_redirect_error"
            }
            NetworkError::ConnectionFailed(_) | NetworkError::ConnectionCantBeCreated(_) => {
                "sdk_connection_error"
            }
            NetworkError::PathUnavailable(_) => "sdk_no_data_connectivity",
            NetworkError::Other(_) => "sdk_error",
        }
    }
}
