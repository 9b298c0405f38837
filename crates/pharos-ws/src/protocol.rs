//! Subprotocol negotiation.
//!
//! The client lists the subprotocols it can speak in preference order;
//! the server answers with at most one of them. The tie-break is the
//! client's order, not the server's.

use http::Request;

/// Extract the subprotocols offered by the client, in preference order.
///
/// Handles both comma-separated values and repeated
/// `sec-websocket-protocol` headers.
pub fn offered_protocols<B>(request: &Request<B>) -> Vec<String> {
    request
        .headers()
        .get_all("sec-websocket-protocol")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(',').map(str::trim))
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}

/// Select the subprotocol to answer with.
///
/// Returns the first entry of `offered` (the client's preference order)
/// that the server also supports, or `None` when there is no overlap or
/// the client offered nothing.
pub fn select(offered: &[String], supported: &[String]) -> Option<String> {
    offered
        .iter()
        .find(|candidate| supported.iter().any(|s| s == *candidate))
        .cloned()
}
