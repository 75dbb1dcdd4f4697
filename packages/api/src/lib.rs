//! # snauth
//!
//! Public entry point of the verification SDK. [`Sdk`] wraps the
//! cellular-path HTTP client from `snauth_client` behind two calls: open a
//! verification URL, optionally with a bearer token, and get back one
//! normalized result map. Every call is independent; the SDK holds no
//! session state beyond its configuration.
//!
//! Operator identifiers are read once at construction from an
//! [`OperatorIdentifierSource`] and sent on the first hop of every request.

use std::time::Duration;

use serde_json::{Map, Value};
use url::Url;

pub use snauth_client::{
    CellularClient, ClientConfig, ConnectionManager, NetworkError, SDK_VERSION,
};

/// Supplies the mobile operator identifiers of the device, typically from a
/// platform telephony API. Queried once when the [`Sdk`] is built.
pub trait OperatorIdentifierSource {
    fn operator_identifiers(&self) -> Vec<String>;
}

/// Source for platforms without telephony access.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOperators;

impl OperatorIdentifierSource for NoOperators {
    fn operator_identifiers(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Fixed operator identifiers, handed in by the host application.
#[derive(Debug, Clone, Default)]
pub struct StaticOperators(pub Vec<String>);

impl OperatorIdentifierSource for StaticOperators {
    fn operator_identifiers(&self) -> Vec<String> {
        self.0.clone()
    }
}

fn join_operators(source: &impl OperatorIdentifierSource) -> Option<String> {
    let identifiers = source.operator_identifiers();
    if identifiers.is_empty() {
        None
    } else {
        Some(identifiers.join(","))
    }
}

/// The SDK facade. Owns a connection manager and the operator identifiers
/// captured at construction.
pub struct Sdk<M: ConnectionManager = CellularClient> {
    manager: M,
    operators: Option<String>,
}

impl Sdk<CellularClient> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_manager(CellularClient::new())
    }

    /// SDK with a custom per-hop connection timeout.
    #[must_use]
    pub fn with_connection_timeout(timeout: Duration) -> Self {
        Self::with_manager(CellularClient::with_connection_timeout(timeout))
    }
}

impl Default for Sdk<CellularClient> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: ConnectionManager> Sdk<M> {
    /// SDK over an explicit connection manager. This is the seam platform
    /// bindings and tests inject through.
    pub fn with_manager(manager: M) -> Self {
        Self {
            manager,
            operators: None,
        }
    }

    /// Capture operator identifiers from `source`. They are joined with
    /// commas once, here, and resent verbatim on the first hop of every
    /// subsequent request.
    #[must_use]
    pub fn with_operator_source(mut self, source: &impl OperatorIdentifierSource) -> Self {
        self.operators = join_operators(source);
        self
    }

    /// Open a verification URL over the cellular data path and resolve with
    /// one result map. Set `debug` to attach device info and the request
    /// trace to the result.
    pub async fn open_with_data_cellular(&self, url: Url, debug: bool) -> Map<String, Value> {
        // `debug` itself would shadow `tracing::field::debug` inside the
        // macro, so the field gets its own name.
        let debug_requested = debug;
        tracing::debug!(target: "snauth", %url, debug_requested, "open");
        self.manager
            .open(url, None, debug, self.operators.clone())
            .await
    }

    /// Same as [`Sdk::open_with_data_cellular`] but sends `access_token` as
    /// a bearer credential on the first hop.
    pub async fn open_with_data_cellular_and_access_token(
        &self,
        url: Url,
        access_token: &str,
        debug: bool,
    ) -> Map<String, Value> {
        let debug_requested = debug;
        tracing::debug!(target: "snauth", %url, debug_requested, "open with access token");
        self.manager
            .open(
                url,
                Some(access_token.to_string()),
                debug,
                self.operators.clone(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct OpenCall {
        url: Url,
        access_token: Option<String>,
        debug: bool,
        operators: Option<String>,
    }

    #[derive(Default)]
    struct RecordingManager {
        calls: Mutex<Vec<OpenCall>>,
    }

    impl ConnectionManager for RecordingManager {
        async fn open(
            &self,
            url: Url,
            access_token: Option<String>,
            debug: bool,
            operators: Option<String>,
        ) -> Map<String, Value> {
            self.calls.lock().unwrap().push(OpenCall {
                url,
                access_token,
                debug,
                operators,
            });
            let mut map = Map::new();
            map.insert("http_status".to_string(), Value::from(200));
            map
        }
    }

    #[tokio::test]
    async fn open_forwards_url_and_debug_flag() {
        let sdk = Sdk::with_manager(RecordingManager::default());
        let url = Url::parse("https://auth.example.com/check").unwrap();

        let result = sdk.open_with_data_cellular(url.clone(), true).await;
        assert_eq!(result["http_status"], Value::from(200));

        let calls = sdk.manager.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].url, url);
        assert!(calls[0].debug);
        assert_eq!(calls[0].access_token, None);
        assert_eq!(calls[0].operators, None);
    }

    #[tokio::test]
    async fn access_token_variant_passes_the_bearer_credential() {
        let sdk = Sdk::with_manager(RecordingManager::default());
        let url = Url::parse("https://auth.example.com/check").unwrap();

        sdk.open_with_data_cellular_and_access_token(url, "tok-9", false)
            .await;

        let calls = sdk.manager.calls.lock().unwrap();
        assert_eq!(calls[0].access_token, Some("tok-9".to_string()));
        assert!(!calls[0].debug);
    }

    #[tokio::test]
    async fn operator_identifiers_are_joined_once_and_resent() {
        let source = StaticOperators(vec!["26201".to_string(), "26202".to_string()]);
        let sdk = Sdk::with_manager(RecordingManager::default()).with_operator_source(&source);
        let url = Url::parse("https://auth.example.com/check").unwrap();

        sdk.open_with_data_cellular(url.clone(), false).await;
        sdk.open_with_data_cellular(url, false).await;

        let calls = sdk.manager.calls.lock().unwrap();
        assert_eq!(calls[0].operators, Some("26201,26202".to_string()));
        assert_eq!(calls[1].operators, Some("26201,26202".to_string()));
    }

    #[tokio::test]
    async fn empty_operator_source_sends_none() {
        let sdk = Sdk::with_manager(RecordingManager::default()).with_operator_source(&NoOperators);
        let url = Url::parse("https://auth.example.com/check").unwrap();

        sdk.open_with_data_cellular(url, false).await;

        let calls = sdk.manager.calls.lock().unwrap();
        assert_eq!(calls[0].operators, None);
    }
}
