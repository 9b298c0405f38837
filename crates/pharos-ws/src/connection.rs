//! Connection records and their lifecycle.
//!
//! A [`Connection`] is the registry-visible record of a completed
//! handshake. It does not own the transport: the raw stream lives in a
//! [`TransportHandle`] owned by whoever consumed the
//! connection-established event, and the record keeps only a weak
//! back-reference.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use pharos_route::RoutePattern;
use uuid::Uuid;

use crate::error::{WsError, WsResult};

/// A unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a new random connection ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle stage of a connection record.
///
/// Transitions are strictly monotonic: `Connecting → Open → Closing →
/// Closed`, with `Closed` terminal. Forward skips are allowed (a record
/// may go straight from `Open` to `Closed`); backward moves are refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadyState {
    /// Handshake in flight.
    Connecting,
    /// Handshake complete, transport open.
    Open,
    /// Close initiated, not yet complete.
    Closing,
    /// Terminal.
    Closed,
}

impl ReadyState {
    /// Whether the state permits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// Owner of a raw upgraded transport stream.
///
/// Created by the engine once a `101` response has been written. The
/// event consumer holds the `Arc` and may [`take`](Self::take) the
/// stream out to drive the post-handshake protocol; the registry's
/// [`Connection`] record holds only a `Weak` reference and never
/// interferes with socket lifetime.
pub struct TransportHandle<S> {
    stream: Mutex<Option<S>>,
}

impl<S> TransportHandle<S> {
    pub(crate) fn new(stream: S) -> Arc<Self> {
        Arc::new(Self {
            stream: Mutex::new(Some(stream)),
        })
    }

    /// Take ownership of the raw stream.
    ///
    /// Returns `None` if the stream was already taken.
    pub fn take(&self) -> Option<S> {
        self.stream.lock().take()
    }

    /// Whether the raw stream has already been taken.
    pub fn is_taken(&self) -> bool {
        self.stream.lock().is_none()
    }
}

impl<S> fmt::Debug for TransportHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportHandle")
            .field("taken", &self.is_taken())
            .finish()
    }
}

/// The registry-visible record of an established connection.
pub struct Connection<S = tokio::net::TcpStream> {
    id: ConnectionId,
    route: RoutePattern,
    path: String,
    subprotocol: Option<String>,
    wildcard_segment: Option<String>,
    state: Mutex<ReadyState>,
    transport: Weak<TransportHandle<S>>,
}

impl<S> Connection<S> {
    /// Create a record in the `Open` state.
    ///
    /// Called by the engine after the `101` response has been written;
    /// from that point the record is committed.
    pub(crate) fn open(
        route: RoutePattern,
        path: String,
        subprotocol: Option<String>,
        wildcard_segment: Option<String>,
        transport: Weak<TransportHandle<S>>,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            route,
            path,
            subprotocol,
            wildcard_segment,
            state: Mutex::new(ReadyState::Open),
            transport,
        }
    }

    /// The connection ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The route pattern that owns this connection.
    pub fn route(&self) -> &RoutePattern {
        &self.route
    }

    /// The request path the handshake arrived on.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The negotiated subprotocol, if any.
    pub fn subprotocol(&self) -> Option<&str> {
        self.subprotocol.as_deref()
    }

    /// The wildcard segment this connection was bucketed under, if the
    /// owning route is a wildcard route.
    pub fn wildcard_segment(&self) -> Option<&str> {
        self.wildcard_segment.as_deref()
    }

    /// The current ready state.
    pub fn state(&self) -> ReadyState {
        *self.state.lock()
    }

    /// Advance the ready state.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::InvalidTransition`] when `next` is not
    /// strictly later in the lifecycle than the current state.
    pub fn advance(&self, next: ReadyState) -> WsResult<()> {
        let mut state = self.state.lock();
        if next > *state {
            *state = next;
            Ok(())
        } else {
            Err(WsError::InvalidTransition {
                from: *state,
                to: next,
            })
        }
    }

    /// The transport handle, if the owning side still holds it.
    pub fn transport(&self) -> Option<Arc<TransportHandle<S>>> {
        self.transport.upgrade()
    }
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("route", &self.route.as_str())
            .field("path", &self.path)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
