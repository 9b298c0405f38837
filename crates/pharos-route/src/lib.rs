//! Route pattern matching for the Pharos WebSocket gateway.
//!
//! This crate provides the path-matching primitive used by the upgrade
//! engine to decide which requests a server instance is willing to
//! handshake with. A pattern is either *literal* (matched
//! character-for-character) or carries a single *trailing wildcard*
//! segment that captures any non-empty suffix of the request path.
//!
//! # Example
//!
//! ```rust
//! use pharos_route::RoutePattern;
//!
//! let pattern = RoutePattern::parse("/chat/:room")?;
//!
//! assert!(pattern.matches("/chat/lobby"));
//! assert_eq!(pattern.wildcard_segment("/chat/lobby"), Some("lobby"));
//! assert!(!pattern.matches("/chatroom"));
//! # Ok::<(), pharos_route::PatternError>(())
//! ```
//!
//! # Pattern grammar
//!
//! ```text
//! pattern  = "/" literal-path [ ":" name ]
//! ```
//!
//! The wildcard marker is only valid immediately after the final `/` of
//! the pattern, and at most one marker is allowed. Anything else is
//! rejected when the pattern is parsed, so a constructed [`RoutePattern`]
//! is always well-formed.

mod pattern;

pub use pattern::{PatternError, PatternKind, RoutePattern};
