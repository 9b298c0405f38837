//! The upgrade orchestrator.
//!
//! [`WsServer`] wires an inbound upgrade event through validation to an
//! abort or an accept, writes the response to the transport, updates the
//! connection registry, and emits notifications on an event channel.
//! Each upgrade attempt is terminal in one pass; there are no retries.

use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};

use crate::config::ServerConfig;
use crate::connection::{Connection, TransportHandle};
use crate::error::{RejectReason, WsResult};
use crate::registry::ConnectionRegistry;
use crate::upgrade::{accept_response, negotiate_subprotocol, reject_response, validate_upgrade};

/// Notifications emitted by a [`WsServer`].
///
/// Fire-and-forget: the engine does not wait for acknowledgement, and a
/// dropped receiver is not an error.
#[derive(Debug)]
pub enum ServerEvent<S = tokio::net::TcpStream> {
    /// A handshake completed and the connection record was registered.
    ConnectionEstablished {
        /// The committed connection record.
        connection: Arc<Connection<S>>,
        /// Owning handle to the upgraded transport; take the stream out
        /// of it to drive the post-handshake protocol.
        transport: Arc<TransportHandle<S>>,
    },
    /// Non-upgrade HTTP traffic arrived on the same listener.
    PlainRequest {
        /// The request head.
        request: Request<()>,
        /// Owning handle to the untouched transport.
        transport: Arc<TransportHandle<S>>,
    },
}

/// The terminal result of one upgrade attempt.
#[derive(Debug)]
pub enum HandshakeOutcome<S = tokio::net::TcpStream> {
    /// The `101` was written and the record committed.
    Accepted(Arc<Connection<S>>),
    /// The abort response was written and the transport closed.
    Rejected(RejectReason),
}

/// A WebSocket upgrade server for a single route.
///
/// The server owns the configuration and the connection registry. It
/// performs no transport binding; upgrade events are delivered to
/// [`handle_upgrade`](Self::handle_upgrade) by the surrounding listener
/// (or externally, in `no_server` deployments).
///
/// # Example
///
/// ```rust
/// use pharos_ws::{ServerConfig, WsServer};
///
/// let config = ServerConfig::builder("/chat/:room")
///     .subprotocols(["chatv1"])
///     .build()?;
/// let (server, _events) = WsServer::<tokio::io::DuplexStream>::new(config);
///
/// assert!(server.registry().is_empty());
/// # Ok::<(), pharos_ws::WsError>(())
/// ```
pub struct WsServer<S = tokio::net::TcpStream> {
    /// Immutable per-instance configuration.
    config: ServerConfig,
    /// Live connections, partitioned to match the route shape.
    registry: ConnectionRegistry<S>,
    /// Notification channel.
    events: mpsc::UnboundedSender<ServerEvent<S>>,
}

impl<S> WsServer<S> {
    /// Create a server and the receiving end of its event channel.
    ///
    /// The registry shape is fixed here, from the configured route, and
    /// never changes afterwards.
    pub fn new(config: ServerConfig) -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEvent<S>>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let registry = ConnectionRegistry::for_pattern(config.route());
        let server = Arc::new(Self {
            config,
            registry,
            events,
        });
        (server, receiver)
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The connection registry.
    pub fn registry(&self) -> &ConnectionRegistry<S> {
        &self.registry
    }

    /// List the peer connections for an endpoint.
    ///
    /// See [`ConnectionRegistry::peers`] for the flat/wildcard contract.
    pub fn peers(&self, segment: Option<&str>) -> WsResult<Vec<Arc<Connection<S>>>> {
        self.registry.peers(segment)
    }

    /// Forward non-upgrade traffic to the event channel untouched.
    pub fn handle_plain(&self, request: Request<()>, transport: S) {
        let transport = TransportHandle::new(transport);
        let _ = self.events.send(ServerEvent::PlainRequest { request, transport });
    }
}

impl<S> WsServer<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Process one inbound upgrade event to completion.
    ///
    /// On rejection the abort response is written and the transport
    /// shut down. On success the `101` response is written — from that
    /// moment the handshake cannot be rolled back — the connection
    /// record is inserted into the registry, and a
    /// [`ServerEvent::ConnectionEstablished`] notification is emitted.
    ///
    /// # Errors
    ///
    /// Only transport write failures and registry insertion misuse
    /// surface as errors; a rejected handshake is a normal
    /// [`HandshakeOutcome::Rejected`] outcome.
    #[instrument(skip(self, request, transport), fields(path = %request.uri().path()))]
    pub async fn handle_upgrade(
        &self,
        request: &Request<()>,
        mut transport: S,
    ) -> WsResult<HandshakeOutcome<S>> {
        let approval = match validate_upgrade(request, &self.config) {
            Ok(approval) => approval,
            Err(reason) => {
                debug!(%reason, status = %reason.status(), "aborting handshake");
                write_http1_response(&mut transport, reject_response(&reason)).await?;
                transport.shutdown().await?;
                return Ok(HandshakeOutcome::Rejected(reason));
            }
        };

        let subprotocol = negotiate_subprotocol(request, &self.config);
        let response = accept_response(&approval.accept_key, subprotocol.as_deref());
        write_http1_response(&mut transport, response).await?;

        // The 101 is on the wire; the record is committed from here on.
        let handle = TransportHandle::new(transport);
        let connection = Arc::new(Connection::open(
            self.config.route().clone(),
            request.uri().path().to_string(),
            subprotocol,
            approval.wildcard_segment,
            Arc::downgrade(&handle),
        ));
        self.registry.insert(Arc::clone(&connection))?;

        info!(
            connection_id = %connection.id(),
            route = %connection.route(),
            subprotocol = connection.subprotocol().unwrap_or("<none>"),
            "connection established"
        );
        let _ = self.events.send(ServerEvent::ConnectionEstablished {
            connection: Arc::clone(&connection),
            transport: handle,
        });

        Ok(HandshakeOutcome::Accepted(connection))
    }
}

impl<S> std::fmt::Debug for WsServer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsServer")
            .field("route", &self.config.route().as_str())
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Serialize a response head (and any body) as HTTP/1.1 wire bytes and
/// write it to the transport.
///
/// The stream is flushed but deliberately left open; callers decide
/// whether to shut it down (abort) or keep it (accepted upgrade).
pub async fn write_http1_response<S>(
    transport: &mut S,
    response: Response<Full<Bytes>>,
) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let (parts, body) = response.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    };

    let mut wire = Vec::with_capacity(256 + body.len());
    wire.extend_from_slice(b"HTTP/1.1 ");
    wire.extend_from_slice(parts.status.as_str().as_bytes());
    if let Some(reason) = parts.status.canonical_reason() {
        wire.push(b' ');
        wire.extend_from_slice(reason.as_bytes());
    }
    wire.extend_from_slice(b"\r\n");
    for (name, value) in &parts.headers {
        wire.extend_from_slice(name.as_str().as_bytes());
        wire.extend_from_slice(b": ");
        wire.extend_from_slice(value.as_bytes());
        wire.extend_from_slice(b"\r\n");
    }
    if !body.is_empty() {
        wire.extend_from_slice(format!("content-length: {}\r\n", body.len()).as_bytes());
    }
    wire.extend_from_slice(b"\r\n");
    wire.extend_from_slice(&body);

    transport.write_all(&wire).await?;
    transport.flush().await
}
