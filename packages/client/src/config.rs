//! Client configuration.
//!
//! Everything the host platform can tune lives here: the per-hop connection
//! timeout, the redirect bound, whether the process runs in a recognized
//! development/sandbox environment, and the transport-class policy applied
//! to every socket.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::connect::{CellularOnly, TransportClassPolicy, Unrestricted};

/// Default per-hop connection timeout.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Hard cap on redirect hops for one logical request.
pub const MAX_REDIRECTS: u32 = 10;

/// Configuration for a [`crate::CellularClient`].
#[derive(Clone)]
pub struct ClientConfig {
    /// Timeout armed at the start of every hop, including redirect hops.
    pub connection_timeout: Duration,
    /// Maximum number of redirects followed before the request fails.
    pub max_redirects: u32,
    /// Recognized development/test environment. Relaxes the interface
    /// restriction and adds the sandbox marker header to every command.
    pub sandbox: bool,
    /// Socket policy enforcing the required network path class.
    pub transport_policy: Arc<dyn TransportClassPolicy>,
}

impl ClientConfig {
    /// Set the per-hop connection timeout.
    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Override the redirect bound.
    #[must_use]
    pub fn with_max_redirects(mut self, max: u32) -> Self {
        self.max_redirects = max;
        self
    }

    /// Mark the process as running in a recognized development environment.
    ///
    /// Sandbox mode lifts the required-interface restriction (matching the
    /// behavior on simulator builds of the original platform binding) and
    /// makes every command carry the sandbox marker header.
    #[must_use]
    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self.transport_policy = if sandbox {
            Arc::new(Unrestricted)
        } else {
            Arc::new(CellularOnly::default())
        };
        self
    }

    /// Supply a platform-specific transport-class policy.
    #[must_use]
    pub fn with_transport_policy(mut self, policy: Arc<dyn TransportClassPolicy>) -> Self {
        self.transport_policy = policy;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            max_redirects: MAX_REDIRECTS,
            sandbox: false,
            transport_policy: Arc::new(CellularOnly::default()),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("connection_timeout", &self.connection_timeout)
            .field("max_redirects", &self.max_redirects)
            .field("sandbox", &self.sandbox)
            .finish_non_exhaustive()
    }
}
