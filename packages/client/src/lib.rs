//! # snauth_client
//!
//! Minimal, manually-framed HTTP client used for silent network
//! authentication checks. One logical request means: open a connection
//! restricted to the required network path class, write a hand-composed
//! HTTP/1.1 command, reassemble the response stream, follow redirects (with
//! cookie propagation, bounded hop count, per-hop timeout) and resolve with
//! exactly one normalized result map.
//!
//! This is deliberately not a general-purpose HTTP client: no connection
//! reuse, no chunked-transfer decoder, no content negotiation. The byte
//! level framing is the point; the verification backend matches on it.

pub mod command;
pub mod config;
pub mod connect;
pub mod cookie;
pub mod error;
pub mod manager;
pub mod monitor;
pub mod outcome;
pub mod response;
pub mod timeout;
pub mod trace;

pub use config::{ClientConfig, DEFAULT_CONNECTION_TIMEOUT, MAX_REDIRECTS};
pub use connect::{
    CellularOnly, Connection, Connector, Endpoint, NetConnector, TransportClassPolicy,
    Unrestricted,
};
pub use error::NetworkError;
pub use manager::{CellularClient, ConnectionManager};
pub use monitor::{AlwaysAvailable, ControlledObserver, PathMonitor, PathObserver};
pub use response::{ConnectionResponse, RedirectResult};
pub use trace::{DeviceInfo, TraceCollector, TraceInfo, SDK_VERSION};
