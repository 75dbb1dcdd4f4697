//! End-to-end orchestrator tests over a scripted transport.
//!
//! Each test plays a canned sequence of wire responses, one per hop, and
//! asserts on the single result map plus the commands actually sent.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use url::Url;

use snauth_client::{
    AlwaysAvailable, CellularClient, ClientConfig, Connection, ConnectionManager, Connector,
    ControlledObserver, Endpoint, NetworkError, TraceCollector,
};

enum Script {
    Respond(String),
    Hang,
    Fail(NetworkError),
}

#[derive(Default)]
struct Inner {
    scripts: Mutex<VecDeque<Script>>,
    opened: AtomicUsize,
    commands: Mutex<Vec<String>>,
}

#[derive(Clone, Default)]
struct ScriptedConnector {
    inner: Arc<Inner>,
}

impl ScriptedConnector {
    fn playing(scripts: Vec<Script>) -> Self {
        let connector = Self::default();
        *connector.inner.scripts.lock().unwrap() = scripts.into();
        connector
    }

    fn opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    fn commands(&self) -> Vec<String> {
        self.inner.commands.lock().unwrap().clone()
    }
}

struct ScriptedConnection {
    script: Script,
    inner: Arc<Inner>,
}

impl Connector for ScriptedConnector {
    type Conn = ScriptedConnection;

    async fn connect(
        &self,
        _endpoint: &Endpoint,
        _trace: &TraceCollector,
    ) -> Result<ScriptedConnection, NetworkError> {
        self.inner.opened.fetch_add(1, Ordering::SeqCst);
        let script = self
            .inner
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Fail(NetworkError::ConnectionFailed(
                "script exhausted".to_string(),
            )));
        match script {
            Script::Fail(err) => Err(err),
            script => Ok(ScriptedConnection {
                script,
                inner: self.inner.clone(),
            }),
        }
    }
}

impl Connection for ScriptedConnection {
    async fn exchange(
        &mut self,
        command: &[u8],
        _trace: &TraceCollector,
    ) -> Result<Vec<u8>, NetworkError> {
        self.inner
            .commands
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(command).into_owned());
        match &self.script {
            Script::Respond(raw) => Ok(raw.clone().into_bytes()),
            Script::Hang => std::future::pending().await,
            Script::Fail(err) => Err(err.clone()),
        }
    }
}

fn client(
    config: ClientConfig,
    connector: ScriptedConnector,
) -> CellularClient<ScriptedConnector> {
    CellularClient::with_parts(config, connector, Arc::new(AlwaysAvailable::new()))
}

fn ok_json_response() -> String {
    "HTTP/1.1 200 OK\r\n\
     Content-Type: application/json\r\n\
     Connection: close\r\n\r\n\
     {\"encMSISDN\":\"enc-42\",\"opId\":\"26201\",\"errorCode\":\"0\",\"errorDesc\":\"ok\"}"
        .to_string()
}

fn redirect_response(location: &str, set_cookie: Option<&str>) -> String {
    let cookie_line = set_cookie
        .map(|cookie| format!("Set-Cookie: {cookie}\r\n"))
        .unwrap_or_default();
    format!(
        "HTTP/1.1 302 Found\r\n\
         Content-Length: 0\r\n\
         {cookie_line}Location: {location}\r\n\
         Connection: close\r\n\r\n"
    )
}

#[tokio::test]
async fn ok_response_resolves_with_status_and_mapped_body() {
    let connector = ScriptedConnector::playing(vec![Script::Respond(ok_json_response())]);
    let client = client(ClientConfig::default(), connector.clone());

    let url = Url::parse("https://auth.example.com/check?state=1").unwrap();
    let result = client
        .open(url, Some("tok-1".to_string()), false, Some("26201".to_string()))
        .await;

    assert_eq!(result["http_status"], Value::from(200));
    let body = result["response_body"].as_object().unwrap();
    assert_eq!(body["publicIdentifier"], Value::String("enc-42".to_string()));
    assert_eq!(body["operatorId"], Value::String("26201".to_string()));
    assert_eq!(connector.opened(), 1);

    let commands = connector.commands();
    assert!(commands[0].starts_with("GET /check?state=1 HTTP/1.1\r\n"));
    assert!(commands[0].contains("\r\nAuthorization: Bearer tok-1 \r\n"));
    assert!(commands[0].contains("\r\nx-snauth-ops: 26201 \r\n"));
    assert!(commands[0].contains("\r\nx-snauth-sdk-request: "));
}

#[tokio::test]
async fn redirects_are_followed_with_cookies_and_first_hop_credentials() {
    let connector = ScriptedConnector::playing(vec![
        Script::Respond(redirect_response(
            "https://auth.example.com/step2",
            Some("sess=1; Path=/"),
        )),
        Script::Respond(redirect_response("/step3", Some("t=2"))),
        Script::Respond(ok_json_response()),
    ]);
    let client = client(ClientConfig::default(), connector.clone());

    let url = Url::parse("https://auth.example.com/start").unwrap();
    let result = client
        .open(url, Some("tok-1".to_string()), false, Some("26201".to_string()))
        .await;

    assert_eq!(result["http_status"], Value::from(200));
    assert_eq!(connector.opened(), 3);

    let commands = connector.commands();
    assert!(commands[0].contains("Authorization: Bearer"));
    assert!(!commands[1].contains("Authorization"));
    assert!(!commands[1].contains("x-snauth-ops"));
    assert!(!commands[2].contains("Authorization"));

    assert!(commands[1].starts_with("GET /step2 HTTP/1.1\r\n"));
    assert!(commands[1].contains("\r\nCookie: sess=1\r\n"));
    assert!(commands[2].starts_with("GET /step3 HTTP/1.1\r\n"));
    assert!(commands[2].contains("\r\nCookie: sess=1; t=2\r\n"));
}

#[tokio::test]
async fn exceeding_the_redirect_bound_is_terminal() {
    let connector = ScriptedConnector::playing(
        (0..3)
            .map(|hop| Script::Respond(redirect_response(&format!("/hop{hop}"), None)))
            .collect(),
    );
    let config = ClientConfig::default().with_max_redirects(2);
    let client = client(config, connector.clone());

    let url = Url::parse("https://auth.example.com/start").unwrap();
    let result = client.open(url, None, false, None).await;

    assert_eq!(result["error"], Value::String("sdk_redirect_error".to_string()));
    assert_eq!(
        result["error_description"],
        Value::String("Too many redirects".to_string())
    );
    // The bound is hit when the third redirect is seen; no fourth
    // connection is opened.
    assert_eq!(connector.opened(), 3);
}

#[tokio::test]
async fn hung_exchange_times_out() {
    let connector = ScriptedConnector::playing(vec![Script::Hang]);
    let config = ClientConfig::default().with_connection_timeout(Duration::from_millis(50));
    let client = client(config, connector.clone());

    let url = Url::parse("https://auth.example.com/slow").unwrap();
    let result = client.open(url, None, false, None).await;

    assert_eq!(
        result["error"],
        Value::String("sdk_connection_error".to_string())
    );
    assert_eq!(
        result["error_description"],
        Value::String("Connection timed out".to_string())
    );
}

#[tokio::test]
async fn losing_the_required_path_fails_the_in_flight_request() {
    let connector = ScriptedConnector::playing(vec![Script::Hang]);
    let observer = Arc::new(ControlledObserver::new(true));
    let client = CellularClient::with_parts(
        ClientConfig::default(),
        connector.clone(),
        observer.clone(),
    );

    let flipper = {
        let observer = observer.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            observer.set_available(false);
        })
    };

    let url = Url::parse("https://auth.example.com/check").unwrap();
    let result = client.open(url, None, false, None).await;
    flipper.await.unwrap();

    assert_eq!(
        result["error"],
        Value::String("sdk_no_data_connectivity".to_string())
    );
    assert_eq!(
        result["error_description"],
        Value::String("Data connectivity not available".to_string())
    );
}

#[tokio::test]
async fn non_secure_scheme_is_rejected_before_any_transport_activity() {
    let connector = ScriptedConnector::playing(vec![Script::Respond(ok_json_response())]);
    let client = client(ClientConfig::default(), connector.clone());

    let url = Url::parse("http://auth.example.com/check").unwrap();
    let result = client.open(url, None, true, None).await;

    assert_eq!(result["error"], Value::String("invalid_scheme".to_string()));
    assert!(result.get("debug").is_none());
    assert_eq!(connector.opened(), 0);
    assert!(connector.commands().is_empty());
}

#[tokio::test]
async fn redirect_without_location_is_a_redirect_error() {
    let response = "HTTP/1.1 302 Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
    let connector = ScriptedConnector::playing(vec![Script::Respond(response.to_string())]);
    let client = client(ClientConfig::default(), connector.clone());

    let url = Url::parse("https://auth.example.com/check").unwrap();
    let result = client.open(url, None, false, None).await;

    assert_eq!(result["error"], Value::String("sdk_redirect_error".to_string()));
    assert_eq!(
        result["error_description"],
        Value::String("Invalid redirect URL".to_string())
    );
}

#[tokio::test]
async fn non_2xx_resolves_as_a_finished_response() {
    let response = "HTTP/1.1 404 Not Found\r\nConnection: close\r\n\r\nnothing to see".to_string();
    let connector = ScriptedConnector::playing(vec![Script::Respond(response)]);
    let client = client(ClientConfig::default(), connector.clone());

    let url = Url::parse("https://auth.example.com/missing").unwrap();
    let result = client.open(url, None, false, None).await;

    assert_eq!(result["http_status"], Value::from(404));
    assert!(result.get("error").is_none());
    assert!(result["response_raw_body"]
        .as_str()
        .unwrap()
        .contains("nothing to see"));
}

#[tokio::test]
async fn garbage_preamble_is_a_malformed_response_error() {
    let connector =
        ScriptedConnector::playing(vec![Script::Respond("INVALID_RESPONSE".to_string())]);
    let client = client(ClientConfig::default(), connector.clone());

    let url = Url::parse("https://auth.example.com/check").unwrap();
    let result = client.open(url, None, false, None).await;

    assert_eq!(result["error"], Value::String("sdk_error".to_string()));
    assert_eq!(
        result["error_description"],
        Value::String("Invalid HTTP response".to_string())
    );
}

#[tokio::test]
async fn connector_failures_surface_as_connection_errors() {
    let connector = ScriptedConnector::playing(vec![Script::Fail(
        NetworkError::ConnectionCantBeCreated("Connection can't be created".to_string()),
    )]);
    let client = client(ClientConfig::default(), connector.clone());

    let url = Url::parse("https://auth.example.com/check").unwrap();
    let result = client.open(url, None, false, None).await;

    assert_eq!(
        result["error"],
        Value::String("sdk_connection_error".to_string())
    );
    assert_eq!(
        result["error_description"],
        Value::String("Connection can't be created".to_string())
    );
}

#[tokio::test]
async fn debug_flag_attaches_device_info_and_trace() {
    let connector = ScriptedConnector::playing(vec![Script::Respond(ok_json_response())]);
    let client = client(ClientConfig::default(), connector.clone());

    let url = Url::parse("https://auth.example.com/check").unwrap();
    let result = client.open(url, None, true, None).await;

    assert_eq!(result["http_status"], Value::from(200));
    let debug = result["debug"].as_object().unwrap();
    assert!(debug["device_info"].as_str().unwrap().contains("snauth-sdk-rust"));
    let trace = debug["url_trace"].as_str().unwrap();
    assert!(trace.contains("Status code: 200"));
    assert!(trace.contains("HTTP Command"));
}
