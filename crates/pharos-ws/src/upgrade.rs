//! Upgrade handshake validation per RFC 6455 §4.2.
//!
//! Everything in this module is pure computation over the request head:
//! no side effects, no registry access. Validating the same request
//! twice yields the same classification and the same accept token.

use base64::Engine;
use bytes::Bytes;
use http::{header, Method, Request, Response, StatusCode, Version};
use http_body_util::Full;
use sha1::{Digest, Sha1};
use tracing::{debug, instrument};

use crate::config::ServerConfig;
use crate::error::RejectReason;
use crate::protocol;

/// The WebSocket magic GUID appended to the client key before hashing
/// (RFC 6455 §4.2.2).
const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Compute the `Sec-WebSocket-Accept` token for a client key.
///
/// Deterministic: trim surrounding whitespace, append the magic GUID,
/// SHA-1 the UTF-8 bytes, base64-encode the 20-byte digest.
pub fn compute_accept_key(client_key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(client_key.trim().as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

/// Check that a client key is a base64-encoded 16-byte nonce.
///
/// Operationally: exactly 24 characters, the final two being `==` (the
/// only padding pattern a 16-byte payload can produce), drawn from the
/// base64 alphabet.
fn is_valid_client_key(key: &str) -> bool {
    let key = key.trim();
    if key.len() != 24 || !key.ends_with("==") {
        return false;
    }
    base64::engine::general_purpose::STANDARD
        .decode(key)
        .map(|nonce| nonce.len() == 16)
        .unwrap_or(false)
}

/// A request that passed every handshake check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    /// The computed `Sec-WebSocket-Accept` token.
    pub accept_key: String,
    /// The wildcard segment extracted from the request path, when the
    /// configured route is a wildcard route.
    pub wildcard_segment: Option<String>,
}

fn header_str<'r, B>(request: &'r Request<B>, name: &str) -> Option<&'r str> {
    request.headers().get(name).and_then(|v| v.to_str().ok())
}

fn malformed(detail: &str) -> RejectReason {
    RejectReason::MalformedRequest(detail.to_string())
}

/// Validate an upgrade request against a server's configuration.
///
/// Checks run in a fixed order and the first failure wins, because the
/// reported reason selects the abort status code:
///
/// 1. route match — [`RejectReason::RouteMismatch`]
/// 2. origin policy — [`RejectReason::OriginRejected`]
/// 3. structural validity — [`RejectReason::MalformedRequest`]
/// 4. protocol version — [`RejectReason::UnsupportedVersion`]
#[instrument(skip(request, config), fields(path = %request.uri().path()))]
pub fn validate_upgrade<B>(
    request: &Request<B>,
    config: &ServerConfig,
) -> Result<Approval, RejectReason> {
    let path = request.uri().path();

    if !config.route().matches(path) {
        debug!(route = %config.route(), "route mismatch");
        return Err(RejectReason::RouteMismatch);
    }

    let origin = header_str(request, "origin");
    if !config.origin_policy().allows(origin) {
        debug!(origin = origin.unwrap_or("<absent>"), "origin rejected");
        return Err(RejectReason::OriginRejected);
    }

    if request.version() < Version::HTTP_11 {
        return Err(malformed("HTTP version must be at least 1.1"));
    }
    if request.method() != Method::GET {
        return Err(malformed("method must be GET"));
    }
    if path.is_empty() {
        return Err(malformed("request path is empty"));
    }

    let upgrade = header_str(request, "upgrade")
        .ok_or_else(|| malformed("missing upgrade header"))?;
    if !upgrade.eq_ignore_ascii_case("websocket") {
        return Err(malformed("upgrade header must be 'websocket'"));
    }

    let connection = header_str(request, "connection")
        .ok_or_else(|| malformed("missing connection header"))?;
    if !connection.eq_ignore_ascii_case("upgrade") {
        return Err(malformed("connection header must be 'upgrade'"));
    }

    let key = header_str(request, "sec-websocket-key")
        .ok_or_else(|| malformed("missing sec-websocket-key header"))?;
    if !is_valid_client_key(key) {
        return Err(malformed(
            "sec-websocket-key is not a base64-encoded 16-byte nonce",
        ));
    }

    if header_str(request, "sec-websocket-version") != Some("13") {
        return Err(RejectReason::UnsupportedVersion);
    }

    Ok(Approval {
        accept_key: compute_accept_key(key),
        wildcard_segment: config.route().wildcard_segment(path).map(String::from),
    })
}

/// Build the `101 Switching Protocols` response for an approved upgrade.
pub fn accept_response(accept_key: &str, subprotocol: Option<&str>) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header(header::UPGRADE, "websocket")
        .header(header::CONNECTION, "Upgrade")
        .header("Sec-WebSocket-Accept", accept_key);

    if let Some(subprotocol) = subprotocol {
        builder = builder.header("Sec-WebSocket-Protocol", subprotocol);
    }

    builder.body(Full::new(Bytes::new())).unwrap()
}

/// Build the abort response for a rejected upgrade.
///
/// A version rejection always carries `Sec-WebSocket-Version: 13` so
/// the client can retry correctly.
pub fn reject_response(reason: &RejectReason) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(reason.status())
        .header(header::CONTENT_TYPE, "text/plain");

    if matches!(reason, RejectReason::UnsupportedVersion) {
        builder = builder.header("Sec-WebSocket-Version", "13");
    }

    builder
        .body(Full::new(Bytes::from(reason.to_string())))
        .unwrap()
}

/// Negotiate the subprotocol for an approved upgrade.
///
/// Delegates to [`protocol::select`] with the client's offer list; a
/// server with no configured subprotocols never answers with one.
pub fn negotiate_subprotocol<B>(request: &Request<B>, config: &ServerConfig) -> Option<String> {
    let supported = config.subprotocols()?;
    protocol::select(&protocol::offered_protocols(request), supported)
}
