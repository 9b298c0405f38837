//! Error types for the upgrade handshake engine.
//!
//! Handshake rejections are a classification, not a process failure:
//! they are represented by [`RejectReason`] and handled locally by
//! aborting the offending connection with the matching status code.
//! [`WsError`] covers everything that is reported to the caller instead.

use std::fmt;

use http::StatusCode;
use thiserror::Error;

use crate::connection::ReadyState;

/// Result type for upgrade engine operations.
pub type WsResult<T> = Result<T, WsError>;

/// Errors reported synchronously to callers of the engine.
#[derive(Debug, Error)]
pub enum WsError {
    /// The configured route pattern was malformed.
    #[error("invalid route pattern: {0}")]
    InvalidPattern(#[from] pharos_route::PatternError),

    /// The registry was queried or updated in a way its shape does not
    /// support.
    #[error("registry misuse: {reason}")]
    RegistryMisuse {
        /// What the caller did wrong.
        reason: String,
    },

    /// A connection record was asked to move backwards through its
    /// lifecycle.
    #[error("invalid ready state transition: {from} -> {to}")]
    InvalidTransition {
        /// The state the record was in.
        from: ReadyState,
        /// The state the caller asked for.
        to: ReadyState,
    },

    /// I/O error while writing a handshake response.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WsError {
    /// Create a new registry misuse error.
    pub fn registry_misuse(reason: impl Into<String>) -> Self {
        Self::RegistryMisuse {
            reason: reason.into(),
        }
    }
}

/// Why an upgrade request was rejected.
///
/// The variants follow the order the checks run in: route, origin,
/// structure, protocol version. The first failing check determines the
/// reported reason and thereby the abort status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The request path does not match the configured route pattern.
    RouteMismatch,

    /// The request origin was denied by the configured origin policy.
    OriginRejected,

    /// The request is structurally not a conformant RFC 6455 handshake
    /// (method, HTTP version, required headers, or key format).
    MalformedRequest(String),

    /// The `sec-websocket-version` header is missing or not `13`.
    UnsupportedVersion,
}

impl RejectReason {
    /// The HTTP status code used to abort the handshake.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RouteMismatch => StatusCode::NOT_FOUND,
            Self::OriginRejected => StatusCode::FORBIDDEN,
            Self::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedVersion => StatusCode::UPGRADE_REQUIRED,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RouteMismatch => write!(f, "request path does not match the configured route"),
            Self::OriginRejected => write!(f, "origin not allowed by policy"),
            Self::MalformedRequest(detail) => write!(f, "malformed upgrade request: {detail}"),
            Self::UnsupportedVersion => {
                write!(f, "unsupported websocket protocol version (expected 13)")
            }
        }
    }
}
