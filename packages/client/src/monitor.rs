//! Required-path availability monitoring.
//!
//! Observation is decoupled from any single connection: the platform layer
//! feeds availability of the required path class into a watch channel, and
//! the orchestrator races every hop against [`PathMonitor::lost`]. Losing
//! the path fails the in-flight request immediately, whether or not a
//! connection attempt has started.

use tokio::sync::watch;

use crate::trace::TraceCollector;

/// Capability interface: something that knows whether the required network
/// path class is currently usable.
pub trait PathObserver: Send + Sync {
    /// Subscribe to availability updates. The current value is delivered
    /// first; `true` means the path is usable.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// Observer for hosts without a platform binding: the path is always
/// considered available.
pub struct AlwaysAvailable {
    sender: watch::Sender<bool>,
}

impl AlwaysAvailable {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(true);
        Self { sender }
    }
}

impl Default for AlwaysAvailable {
    fn default() -> Self {
        Self::new()
    }
}

impl PathObserver for AlwaysAvailable {
    fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

/// Test/platform helper: an observer whose availability can be flipped at
/// any time.
pub struct ControlledObserver {
    sender: watch::Sender<bool>,
}

impl ControlledObserver {
    #[must_use]
    pub fn new(available: bool) -> Self {
        let (sender, _) = watch::channel(available);
        Self { sender }
    }

    pub fn set_available(&self, available: bool) {
        // Send errors only mean no request is currently watching.
        let _ = self.sender.send(available);
    }
}

impl PathObserver for ControlledObserver {
    fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

/// Per-request monitor; starts when the request begins, stops on cleanup.
pub struct PathMonitor {
    receiver: watch::Receiver<bool>,
}

impl PathMonitor {
    pub fn start(observer: &dyn PathObserver, trace: &TraceCollector) -> Self {
        let receiver = observer.subscribe();
        if *receiver.borrow() {
            trace.add_debug("Required network path available");
        } else {
            trace.add_debug("Required network path not available");
        }
        Self { receiver }
    }

    /// Resolves with a description once the required path becomes unusable.
    /// Pends forever while the path stays up (or when the observer goes
    /// away without reporting a loss).
    pub async fn lost(&mut self) -> String {
        loop {
            if !*self.receiver.borrow() {
                return "Data connectivity not available".to_string();
            }
            if self.receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Stop observing. Dropping has the same effect; the method exists so
    /// cleanup reads explicitly at the call site.
    pub fn stop(self) {}
}
