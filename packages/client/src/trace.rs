//! Debug trace collection.
//!
//! The trace collector is a product artifact, not a logger: when the caller
//! requests debug output, the finalized trace is attached to the result map
//! under the `debug` key. It still mirrors every entry into `tracing` so the
//! host's subscriber sees the same stream.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};

/// Client version reported in the user agent and device descriptor.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

const CLIENT_NAME: &str = "snauth-sdk-rust";

/// Static descriptor of the client build and host platform.
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo;

impl DeviceInfo {
    /// Device/client descriptor attached to debug output.
    #[must_use]
    pub fn device_string(&self) -> String {
        format!(
            "{};{};{}/{}",
            std::env::consts::OS,
            std::env::consts::ARCH,
            CLIENT_NAME,
            SDK_VERSION
        )
    }

    /// Fixed `User-Agent` value: client name + version + OS descriptor.
    #[must_use]
    pub fn user_agent(&self, sdk_version: &str) -> String {
        format!(
            "{CLIENT_NAME}/{sdk_version} {}/{}",
            std::env::consts::OS,
            std::env::consts::ARCH
        )
    }
}

/// Severity of a single debug entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceLevel {
    Debug,
    Error,
}

/// One timestamped debug entry.
#[derive(Debug, Clone)]
pub struct TraceEntry {
    pub at: DateTime<Utc>,
    pub level: TraceLevel,
    pub message: String,
}

/// Frozen snapshot of one request's trace, attached to the result exactly
/// once at completion.
#[derive(Debug, Clone)]
pub struct TraceInfo {
    pub device: DeviceInfo,
    pub trace: String,
}

#[derive(Default)]
struct TraceState {
    debug_enabled: bool,
    trace_active: bool,
    entries: Vec<TraceEntry>,
    buffer: String,
}

/// Append-only structured log plus a freeform trace buffer.
///
/// Handles are cheap to clone; the connector and the orchestrator share one
/// collector per logical request.
#[derive(Clone, Default)]
pub struct TraceCollector {
    device: DeviceInfo,
    state: Arc<Mutex<TraceState>>,
}

impl TraceCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn on debug entry collection for this request.
    pub fn enable_debug(&self) {
        self.lock().debug_enabled = true;
    }

    #[must_use]
    pub fn is_debug_enabled(&self) -> bool {
        self.lock().debug_enabled
    }

    /// Open the freeform trace buffer.
    pub fn start_trace(&self) {
        self.lock().trace_active = true;
    }

    /// Close the trace buffer. Idempotent.
    pub fn stop_trace(&self) {
        self.lock().trace_active = false;
    }

    /// Record a debug entry and mirror it to `tracing`.
    pub fn add_debug(&self, message: impl Into<String>) {
        self.record(TraceLevel::Debug, message.into());
    }

    /// Record an error-level entry and mirror it to `tracing`.
    pub fn add_error(&self, message: impl Into<String>) {
        self.record(TraceLevel::Error, message.into());
    }

    /// Append a line to the freeform trace buffer, if tracing is active.
    pub fn add_trace(&self, line: impl AsRef<str>) {
        let mut state = self.lock();
        if state.trace_active {
            state.buffer.push_str(line.as_ref());
        }
    }

    /// Current timestamp in the trace's fixed GMT format.
    #[must_use]
    pub fn now(&self) -> String {
        Utc::now()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace('T', " ")
    }

    /// Snapshot the trace. Safe to call more than once; the orchestrator
    /// consumes it exactly once per request.
    #[must_use]
    pub fn trace_info(&self) -> TraceInfo {
        let state = self.lock();
        let mut trace = String::new();
        for entry in &state.entries {
            trace.push_str(&format!(
                "{} [{}] {}\n",
                entry.at.to_rfc3339_opts(SecondsFormat::Millis, true),
                match entry.level {
                    TraceLevel::Debug => "debug",
                    TraceLevel::Error => "error",
                },
                entry.message
            ));
        }
        trace.push_str(&state.buffer);
        TraceInfo {
            device: self.device.clone(),
            trace,
        }
    }

    #[must_use]
    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    fn record(&self, level: TraceLevel, message: String) {
        match level {
            TraceLevel::Debug => tracing::debug!(target: "snauth", "{message}"),
            TraceLevel::Error => tracing::error!(target: "snauth", "{message}"),
        }
        let mut state = self.lock();
        if state.debug_enabled {
            state.entries.push(TraceEntry {
                at: Utc::now(),
                level,
                message,
            });
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TraceState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
