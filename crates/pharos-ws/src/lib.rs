//! RFC 6455 upgrade handshake engine for the Pharos WebSocket gateway.
//!
//! This crate decides whether an inbound HTTP request is a conformant
//! and authorized WebSocket handshake, computes the cryptographic
//! acceptance token, negotiates an application subprotocol, and keeps a
//! registry of the live connections partitioned by route. It does *not*
//! bind a listener and it does *not* speak the post-handshake frame
//! protocol; both belong to the surrounding transport layer.
//!
//! # Handshake flow
//!
//! ```text
//! upgrade request ──► validate_upgrade() ──► RejectReason ──► abort (4xx)
//!                            │
//!                            ▼
//!                        Approval ──► negotiate subprotocol
//!                            │
//!                            ▼
//!                  write 101 Switching Protocols
//!                            │
//!                            ▼
//!              Connection (OPEN) ──► ConnectionRegistry.insert()
//!                            │
//!                            ▼
//!              ServerEvent::ConnectionEstablished
//! ```
//!
//! # Example
//!
//! ```rust
//! use http::{Method, Request, Version};
//! use pharos_ws::{HandshakeOutcome, ServerConfig, WsServer};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), pharos_ws::WsError> {
//! let config = ServerConfig::builder("/chat/:room").build()?;
//! let (server, events) = WsServer::new(config);
//!
//! let request = Request::builder()
//!     .method(Method::GET)
//!     .uri("/chat/lobby")
//!     .version(Version::HTTP_11)
//!     .header("Upgrade", "websocket")
//!     .header("Connection", "Upgrade")
//!     .header("Sec-WebSocket-Key", "dGhlIHNhbXBsZSBub25jZQ==")
//!     .header("Sec-WebSocket-Version", "13")
//!     .body(())
//!     .unwrap();
//!
//! let (client, server_side) = tokio::io::duplex(1024);
//! let outcome = server.handle_upgrade(&request, server_side).await?;
//! assert!(matches!(outcome, HandshakeOutcome::Accepted(_)));
//! assert_eq!(server.peers(Some("lobby"))?.len(), 1);
//! # drop(client);
//! # drop(events);
//! # Ok(())
//! # }
//! ```
//!
//! # Error model
//!
//! A rejected handshake is not an error: it is classified by
//! [`RejectReason`], answered with the matching status code
//! (`404`/`403`/`400`/`426`), and the transport is closed. [`WsError`]
//! is reserved for conditions the caller must deal with, such as
//! querying a wildcard registry without a segment
//! ([`WsError::RegistryMisuse`]) or configuring a malformed route
//! pattern ([`WsError::InvalidPattern`]).

pub mod config;
pub mod connection;
pub mod error;
pub mod origin;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod upgrade;

// Re-exports for convenience
pub use config::{ServerConfig, ServerConfigBuilder};
pub use connection::{Connection, ConnectionId, ReadyState, TransportHandle};
pub use error::{RejectReason, WsError, WsResult};
pub use origin::OriginPolicy;
pub use registry::ConnectionRegistry;
pub use server::{write_http1_response, HandshakeOutcome, ServerEvent, WsServer};
pub use upgrade::{accept_response, compute_accept_key, reject_response, validate_upgrade, Approval};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exports() {
        // Verify all public types are accessible.
        let _id = ConnectionId::new();
        let _policy = OriginPolicy::allow_any();
        let _reason = RejectReason::RouteMismatch;
        let _state = ReadyState::Connecting;
        let _token = compute_accept_key("dGhlIHNhbXBsZSBub25jZQ==");
    }
}
