//! Constrained transport connections.
//!
//! One connection per hop: open, send the composed command, read until the
//! server closes, done. The connector is a trait so the orchestrator can be
//! driven by a scripted transport in tests; [`NetConnector`] is the real
//! implementation (tokio TCP, rustls for the secure scheme, socket policy
//! applied before connecting).

mod policy;

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use socket2::SockRef;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream};
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig as TlsConfig, RootCertStore};
use tokio_rustls::TlsConnector;

pub use policy::{CellularOnly, TransportClassPolicy, Unrestricted};

use crate::error::NetworkError;
use crate::trace::TraceCollector;

const RECEIVE_CHUNK: usize = 65536;

/// A validated connect target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Derive the connect target from a URL, applying the transport-level
    /// validation: scheme and host must be non-empty and the scheme must be
    /// one of `http`/`https`. Returns `None` otherwise (the caller maps
    /// this to [`NetworkError::ConnectionCantBeCreated`]).
    #[must_use]
    pub fn from_url(url: &url::Url) -> Option<Self> {
        let scheme = url.scheme();
        let host = url.host_str()?;
        if host.is_empty() || !matches!(scheme, "http" | "https") {
            return None;
        }
        let port = url.port_or_known_default()?;
        Some(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
        })
    }

    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.scheme == "https"
    }
}

/// One open transport connection, consumed by a single send/receive cycle.
///
/// Dropping a connection cancels it; cancellation is a normal teardown
/// outcome and never produces a completion by itself.
pub trait Connection: Send {
    /// Send the raw command and read the complete response (the peer closes
    /// the stream when it is done).
    fn exchange(
        &mut self,
        command: &[u8],
        trace: &TraceCollector,
    ) -> impl Future<Output = Result<Vec<u8>, NetworkError>> + Send;
}

/// Opens one connection per hop.
pub trait Connector: Send + Sync {
    type Conn: Connection;

    fn connect(
        &self,
        endpoint: &Endpoint,
        trace: &TraceCollector,
    ) -> impl Future<Output = Result<Self::Conn, NetworkError>> + Send;
}

/// Production connector: tokio TCP with the configured transport-class
/// policy, wrapped in rustls for the secure scheme.
pub struct NetConnector {
    policy: Arc<dyn TransportClassPolicy>,
    tls: TlsConnector,
}

impl NetConnector {
    #[must_use]
    pub fn new(policy: Arc<dyn TransportClassPolicy>) -> Self {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let config = TlsConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        Self {
            policy,
            tls: TlsConnector::from(Arc::new(config)),
        }
    }

    async fn open_socket(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        let socket = if addr.is_ipv6() {
            TcpSocket::new_v6()?
        } else {
            TcpSocket::new_v4()?
        };
        self.policy
            .configure(&SockRef::from(&socket), addr.is_ipv6())?;
        socket.connect(addr).await
    }
}

impl Connector for NetConnector {
    type Conn = NetConnection;

    async fn connect(
        &self,
        endpoint: &Endpoint,
        trace: &TraceCollector,
    ) -> Result<NetConnection, NetworkError> {
        trace.add_debug("Connection State: Setup");
        trace.add_trace(format!(
            "Start connection {} {} {} ({}) {}\n",
            endpoint.host,
            endpoint.port,
            endpoint.scheme,
            self.policy.describe(),
            trace.now()
        ));

        let addr = resolve(&endpoint.host, endpoint.port).await?;
        trace.add_debug("Connection State: Preparing");

        let stream = match self.open_socket(addr).await {
            Ok(stream) => stream,
            Err(err) => {
                trace.add_error(format!("Connection State: Failed -> {err}"));
                return Err(classify_io("Connection failed", &err));
            }
        };

        let stream = if endpoint.is_secure() {
            let name = ServerName::try_from(endpoint.host.clone()).map_err(|_| {
                NetworkError::ConnectionCantBeCreated("Connection can't be created".to_string())
            })?;
            match self.tls.connect(name, stream).await {
                Ok(tls) => MaybeTls::Tls(Box::new(tls)),
                Err(err) => {
                    trace.add_error(format!("Connection State: Failed -> {err}"));
                    return Err(NetworkError::ConnectionFailed(format!(
                        "TLS handshake failed: {err}"
                    )));
                }
            }
        } else {
            MaybeTls::Plain(stream)
        };

        trace.add_debug("Connection State: Ready");
        Ok(NetConnection {
            stream: Some(stream),
            trace: trace.clone(),
        })
    }
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, NetworkError> {
    let mut addrs = tokio::net::lookup_host((host, port)).await.map_err(|err| {
        if is_path_loss(&err) {
            NetworkError::PathUnavailable("Data connectivity not available".to_string())
        } else {
            NetworkError::ConnectionFailed(format!("DNS resolution failed: {err}"))
        }
    })?;
    addrs.next().ok_or_else(|| {
        NetworkError::ConnectionFailed(format!("no address for host {host}"))
    })
}

enum MaybeTls {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

/// A live connection. Dropping it tears the stream down (cancelled state).
pub struct NetConnection {
    stream: Option<MaybeTls>,
    trace: TraceCollector,
}

impl Connection for NetConnection {
    async fn exchange(
        &mut self,
        command: &[u8],
        trace: &TraceCollector,
    ) -> Result<Vec<u8>, NetworkError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(NetworkError::ConnectionFailed(
                "connection already consumed".to_string(),
            ));
        };

        if let Err(err) = write_all(stream, command).await {
            trace.add_debug(format!("Send error: {err}"));
            return Err(classify_io("Send error", &err));
        }
        trace.add_debug("Send completed");

        let mut buffer = BytesMut::with_capacity(RECEIVE_CHUNK);
        loop {
            match read_chunk(stream, &mut buffer).await {
                Ok(0) => break,
                Ok(_) => {}
                // Peers that skip the TLS close_notify still delivered a
                // complete response; treat the EOF as end-of-stream.
                Err(err) if err.kind() == io::ErrorKind::UnexpectedEof && !buffer.is_empty() => {
                    break;
                }
                Err(err) => {
                    trace.add_debug(format!("Receive error: {err}"));
                    return Err(classify_io("Receive error", &err));
                }
            }
        }
        trace.add_debug("Receive completed");
        Ok(buffer.to_vec())
    }
}

impl Drop for NetConnection {
    fn drop(&mut self) {
        if self.stream.take().is_some() {
            self.trace.add_debug("Connection State: Cancelled");
        }
    }
}

async fn write_all(stream: &mut MaybeTls, data: &[u8]) -> io::Result<()> {
    match stream {
        MaybeTls::Plain(tcp) => tcp.write_all(data).await,
        MaybeTls::Tls(tls) => tls.write_all(data).await,
    }
}

async fn read_chunk(stream: &mut MaybeTls, buffer: &mut BytesMut) -> io::Result<usize> {
    match stream {
        MaybeTls::Plain(tcp) => tcp.read_buf(buffer).await,
        MaybeTls::Tls(tls) => tls.read_buf(buffer).await,
    }
}

/// Map an IO error either to a connection failure or, when the error says
/// the required path is gone, to path loss.
fn classify_io(context: &str, err: &io::Error) -> NetworkError {
    if is_path_loss(err) {
        NetworkError::PathUnavailable("Data connectivity not available".to_string())
    } else {
        NetworkError::ConnectionFailed(format!("{context}: {err}"))
    }
}

fn is_path_loss(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NetworkDown
            | io::ErrorKind::NetworkUnreachable
            | io::ErrorKind::HostUnreachable
    )
}
