//! Request orchestration.
//!
//! [`CellularClient`] drives one logical request end to end: pre-flight URL
//! guards, the per-hop connect/send/receive cycle, redirect following with
//! cookie propagation, and the race against the hop timeout and the path
//! monitor. The redirect chain is an explicit loop over [`HopState`] rather
//! than a self-referencing completion handler, so exactly-once completion
//! and idempotent cleanup hold by construction: the function returns one
//! map, and every exit path runs the same teardown.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use url::Url;

use crate::command::{build_http_command, CommandContext};
use crate::config::ClientConfig;
use crate::connect::{Connection, Connector, Endpoint, NetConnector};
use crate::cookie::CookieList;
use crate::error::NetworkError;
use crate::monitor::{AlwaysAvailable, PathMonitor, PathObserver};
use crate::outcome::{connection_response_to_map, invalid_scheme_map, network_error_to_map};
use crate::response::{
    decode, parse_redirect, parse_status_line, ConnectionResponse, RedirectResult,
};
use crate::timeout::TimeoutController;
use crate::trace::TraceCollector;

/// Scheme accepted at the request boundary. Anything else is rejected
/// before any transport activity.
const SECURE_SCHEME: &str = "https";

/// Outcome of one hop.
enum ConnectionResult {
    Follow(RedirectResult),
    DataOk(ConnectionResponse),
    DataErr(ConnectionResponse),
    Err(NetworkError),
}

/// Mutable state carried across the redirect hops of one logical request.
/// The bearer token and operator identifiers are consumed by the first hop
/// and never resent.
struct HopState {
    url: Url,
    access_token: Option<String>,
    operators: Option<String>,
    cookies: Option<CookieList>,
    redirects: u32,
}

/// The mockable seam of the client: one call, one result map.
pub trait ConnectionManager: Send + Sync {
    fn open(
        &self,
        url: Url,
        access_token: Option<String>,
        debug: bool,
        operators: Option<String>,
    ) -> impl Future<Output = Map<String, Value>> + Send;
}

/// HTTP-over-constrained-transport client: the request orchestrator.
pub struct CellularClient<C: Connector = NetConnector> {
    config: ClientConfig,
    connector: C,
    observer: Arc<dyn PathObserver>,
}

impl CellularClient<NetConnector> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Client with a custom per-hop connection timeout.
    #[must_use]
    pub fn with_connection_timeout(timeout: Duration) -> Self {
        Self::with_config(ClientConfig::default().with_connection_timeout(timeout))
    }

    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let connector = NetConnector::new(config.transport_policy.clone());
        Self {
            config,
            connector,
            observer: Arc::new(AlwaysAvailable::new()),
        }
    }

    /// Attach the platform's path-availability observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PathObserver>) -> Self {
        self.observer = observer;
        self
    }
}

impl Default for CellularClient<NetConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> CellularClient<C> {
    /// Fully dependency-injected construction, used by tests and platform
    /// bindings that supply their own transport.
    pub fn with_parts(config: ClientConfig, connector: C, observer: Arc<dyn PathObserver>) -> Self {
        Self {
            config,
            connector,
            observer,
        }
    }

    async fn open_inner(
        &self,
        url: Url,
        access_token: Option<String>,
        debug: bool,
        operators: Option<String>,
    ) -> Map<String, Value> {
        let trace = TraceCollector::new();
        if debug {
            trace.enable_debug();
            trace.start_trace();
        }

        if url.host_str().map_or(true, str::is_empty) || url.scheme().is_empty() {
            return network_error_to_map(
                &NetworkError::Other("No scheme or host found".to_string()),
                &trace,
                debug,
            );
        }
        if url.scheme() != SECURE_SCHEME {
            return invalid_scheme_map();
        }

        let request_id = format!("{:016x}{:016x}", fastrand::u64(..), fastrand::u64(..));
        trace.add_debug(format!("url: {url} - {}", trace.now()));

        let mut monitor = PathMonitor::start(&*self.observer, &trace);
        let timeout = TimeoutController::new(self.config.connection_timeout);

        let mut state = HopState {
            url,
            access_token,
            operators,
            cookies: None,
            redirects: 0,
        };

        let outcome = loop {
            let hop = self.run_hop(&state, &request_id, &trace);
            // First terminal event wins: path loss beats the hop, the
            // timeout beats a hung exchange. Dropping the hop future
            // cancels whatever connection it had open.
            let result = tokio::select! {
                biased;
                reason = monitor.lost() => {
                    trace.add_debug("Required network path lost");
                    break Err(NetworkError::PathUnavailable(reason));
                }
                limited = timeout.limit(hop) => match limited {
                    Ok(result) => result,
                    Err(expired) => {
                        trace.add_debug("Connection timed out");
                        break Err(expired);
                    }
                },
            };

            match result {
                ConnectionResult::Follow(redirect) => match redirect.url {
                    Some(next) => {
                        state.redirects += 1;
                        if state.redirects > self.config.max_redirects {
                            trace.add_debug(format!(
                                "MAX redirects reached {}",
                                self.config.max_redirects
                            ));
                            break Err(NetworkError::TooManyRedirects);
                        }
                        trace.add_debug(format!("Redirect found: {next}"));
                        trace.add_trace(format!("\nfound redirect: {next} - {}\n", trace.now()));
                        state.url = next;
                        // Credentials are first-hop only.
                        state.access_token = None;
                        state.operators = None;
                        state.cookies = redirect.cookies;
                    }
                    // A 3xx without a usable target used to hang the caller
                    // forever; it is a terminal redirect error here.
                    None => {
                        trace.add_debug("Redirect target missing");
                        break Err(NetworkError::InvalidRedirectUrl(
                            "Invalid redirect URL".to_string(),
                        ));
                    }
                },
                ConnectionResult::DataOk(response) => {
                    trace.add_debug("Data Ok received");
                    break Ok(response);
                }
                ConnectionResult::DataErr(response) => {
                    trace.add_debug("Data err received");
                    break Ok(response);
                }
                ConnectionResult::Err(err) => {
                    trace.add_debug(format!("Open completed with {err}"));
                    break Err(err);
                }
            }
        };

        // Cleanup runs exactly once, whatever path broke the loop: the hop
        // future (and with it any open connection) is already gone, the
        // timer lives only inside `limit`, and the monitor stops here.
        monitor.stop();

        match outcome {
            Ok(response) => connection_response_to_map(&response, &trace, debug),
            Err(err) => network_error_to_map(&err, &trace, debug),
        }
    }

    /// One connect-send-receive cycle against the current hop target.
    async fn run_hop(
        &self,
        state: &HopState,
        request_id: &str,
        trace: &TraceCollector,
    ) -> ConnectionResult {
        let url = &state.url;
        if url.host_str().is_none() || url.scheme().is_empty() {
            return ConnectionResult::Err(NetworkError::Other(
                "No scheme or host found".to_string(),
            ));
        }

        let Some(endpoint) = Endpoint::from_url(url) else {
            return ConnectionResult::Err(NetworkError::ConnectionCantBeCreated(
                "Connection can't be created".to_string(),
            ));
        };

        let ctx = CommandContext {
            access_token: state.access_token.as_deref(),
            operators: state.operators.as_deref(),
            cookies: state.cookies.as_deref(),
            request_id: Some(request_id),
            sandbox: self.config.sandbox,
        };
        let Some(command) = build_http_command(url, &ctx) else {
            return ConnectionResult::Err(NetworkError::Other(
                "HTTP command can't be created".to_string(),
            ));
        };
        trace.add_debug(format!("HTTP Command: {command}"));

        let mut connection = match self.connector.connect(&endpoint, trace).await {
            Ok(connection) => connection,
            Err(err) => return ConnectionResult::Err(err),
        };
        let raw = match connection.exchange(command.as_bytes(), trace).await {
            Ok(raw) => raw,
            Err(err) => return ConnectionResult::Err(err),
        };
        drop(connection);

        let response = decode(&raw);
        trace.add_trace(format!("Received response {}\n", trace.now()));
        if !response.starts_with("HTTP") {
            return ConnectionResult::Err(NetworkError::Other(
                "Invalid HTTP response".to_string(),
            ));
        }

        let status = parse_status_line(&response);
        trace.add_debug(format!("Status code: {status}"));

        if (300..400).contains(&status) {
            match parse_redirect(url, &response, state.cookies.as_deref()) {
                Some(redirect) => ConnectionResult::Follow(redirect),
                None => ConnectionResult::Err(NetworkError::InvalidRedirectUrl(
                    "Invalid redirect URL".to_string(),
                )),
            }
        } else {
            let connection_response = ConnectionResponse {
                status,
                body: Some(raw),
            };
            if (200..300).contains(&status) {
                ConnectionResult::DataOk(connection_response)
            } else {
                ConnectionResult::DataErr(connection_response)
            }
        }
    }
}

impl<C: Connector> ConnectionManager for CellularClient<C> {
    fn open(
        &self,
        url: Url,
        access_token: Option<String>,
        debug: bool,
        operators: Option<String>,
    ) -> impl Future<Output = Map<String, Value>> + Send {
        self.open_inner(url, access_token, debug, operators)
    }
}
