//! Connection registry.
//!
//! The registry's shape is fixed when the server is constructed: a flat
//! ordered list for literal routes, or segment-keyed buckets for
//! wildcard routes. `insert` and `peers` serialize against each other
//! behind a single lock; bucket selection is cheap and non-blocking so
//! no finer-grained locking is warranted.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use pharos_route::RoutePattern;
use tracing::debug;

use crate::connection::Connection;
use crate::error::{WsError, WsResult};

/// Storage shape, chosen once at construction.
enum Shape<S> {
    /// Every connection serves the same endpoint.
    Flat(Vec<Arc<Connection<S>>>),
    /// One insertion-ordered bucket per distinct wildcard segment seen.
    Wildcard(IndexMap<String, Vec<Arc<Connection<S>>>>),
}

/// Registry of live connections for one server instance.
///
/// Closed connections are not purged automatically; whether and when to
/// prune records is the embedder's call.
pub struct ConnectionRegistry<S = tokio::net::TcpStream> {
    inner: Mutex<Shape<S>>,
}

impl<S> ConnectionRegistry<S> {
    /// A registry holding a single flat list of connections.
    pub fn flat() -> Self {
        Self {
            inner: Mutex::new(Shape::Flat(Vec::new())),
        }
    }

    /// A registry partitioned by wildcard segment.
    pub fn wildcard() -> Self {
        Self {
            inner: Mutex::new(Shape::Wildcard(IndexMap::new())),
        }
    }

    /// Choose the shape that fits a route pattern.
    pub fn for_pattern(pattern: &RoutePattern) -> Self {
        if pattern.is_wildcard() {
            Self::wildcard()
        } else {
            Self::flat()
        }
    }

    /// Whether this registry buckets connections by wildcard segment.
    pub fn is_wildcard(&self) -> bool {
        matches!(&*self.inner.lock(), Shape::Wildcard(_))
    }

    /// Insert a connection record.
    ///
    /// A record lands in exactly one bucket, determined here from the
    /// wildcard segment captured at handshake time, and is never moved.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::RegistryMisuse`] when a record without a
    /// wildcard segment is inserted into a wildcard registry.
    pub fn insert(&self, connection: Arc<Connection<S>>) -> WsResult<()> {
        let mut inner = self.inner.lock();
        match &mut *inner {
            Shape::Flat(list) => {
                list.push(connection);
            }
            Shape::Wildcard(buckets) => {
                let Some(segment) = connection.wildcard_segment() else {
                    return Err(WsError::registry_misuse(
                        "wildcard registry requires a connection with a wildcard segment",
                    ));
                };
                let segment = segment.to_string();
                debug!(connection_id = %connection.id(), segment = %segment, "bucketing connection");
                buckets.entry(segment).or_default().push(connection);
            }
        }
        Ok(())
    }

    /// List the peer connections for an endpoint.
    ///
    /// For a flat registry the full list is returned regardless of
    /// `segment`. For a wildcard registry the bucket for `segment` is
    /// returned (empty for a segment never seen), and omitting the
    /// segment is a usage error: there is no well-defined "all peers"
    /// answer across buckets.
    pub fn peers(&self, segment: Option<&str>) -> WsResult<Vec<Arc<Connection<S>>>> {
        let inner = self.inner.lock();
        match &*inner {
            Shape::Flat(list) => Ok(list.clone()),
            Shape::Wildcard(buckets) => {
                let Some(segment) = segment else {
                    return Err(WsError::registry_misuse(
                        "peers() on a wildcard registry requires a segment",
                    ));
                };
                Ok(buckets.get(segment).cloned().unwrap_or_default())
            }
        }
    }

    /// Total number of registered connections across all buckets.
    pub fn len(&self) -> usize {
        match &*self.inner.lock() {
            Shape::Flat(list) => list.len(),
            Shape::Wildcard(buckets) => buckets.values().map(Vec::len).sum(),
        }
    }

    /// Whether the registry holds no connections.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The wildcard segments seen so far, in first-seen order.
    ///
    /// Empty for a flat registry.
    pub fn segments(&self) -> Vec<String> {
        match &*self.inner.lock() {
            Shape::Flat(_) => Vec::new(),
            Shape::Wildcard(buckets) => buckets.keys().cloned().collect(),
        }
    }
}

impl<S> std::fmt::Debug for ConnectionRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("wildcard", &self.is_wildcard())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionId;
    use std::sync::Weak;

    type TestRegistry = ConnectionRegistry<tokio::io::DuplexStream>;

    fn record(route: &str, path: &str) -> Arc<Connection<tokio::io::DuplexStream>> {
        let route = RoutePattern::parse(route).unwrap();
        let segment = route.wildcard_segment(path).map(String::from);
        Arc::new(Connection::open(
            route,
            path.to_string(),
            None,
            segment,
            Weak::new(),
        ))
    }

    #[test]
    fn test_shape_follows_pattern() {
        let literal = RoutePattern::parse("/chat").unwrap();
        let wildcard = RoutePattern::parse("/chat/:room").unwrap();
        assert!(!TestRegistry::for_pattern(&literal).is_wildcard());
        assert!(TestRegistry::for_pattern(&wildcard).is_wildcard());
    }

    #[test]
    fn test_flat_insert_and_peers() {
        let registry = TestRegistry::flat();
        let a = record("/chat", "/chat");
        let b = record("/chat", "/chat");
        registry.insert(Arc::clone(&a)).unwrap();
        registry.insert(Arc::clone(&b)).unwrap();

        // Argument is irrelevant on a flat registry.
        let peers = registry.peers(None).unwrap();
        assert_eq!(peers.len(), 2);
        let peers = registry.peers(Some("ignored")).unwrap();
        assert_eq!(peers.len(), 2);

        // Insertion order is preserved.
        assert_eq!(peers[0].id(), a.id());
        assert_eq!(peers[1].id(), b.id());
    }

    #[test]
    fn test_wildcard_partitioning() {
        let registry = TestRegistry::wildcard();
        let a = record("/chat/:room", "/chat/room1");
        let b = record("/chat/:room", "/chat/room2");
        let c = record("/chat/:room", "/chat/room1");
        registry.insert(Arc::clone(&a)).unwrap();
        registry.insert(Arc::clone(&b)).unwrap();
        registry.insert(Arc::clone(&c)).unwrap();

        let room1 = registry.peers(Some("room1")).unwrap();
        let ids: Vec<ConnectionId> = room1.iter().map(|conn| conn.id()).collect();
        assert_eq!(ids, vec![a.id(), c.id()]);

        let room2 = registry.peers(Some("room2")).unwrap();
        assert_eq!(room2.len(), 1);
        assert_eq!(room2[0].id(), b.id());

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.segments(), vec!["room1", "room2"]);
    }

    #[test]
    fn test_wildcard_peers_without_segment_is_misuse() {
        let registry = TestRegistry::wildcard();
        registry
            .insert(record("/chat/:room", "/chat/room1"))
            .unwrap();

        let err = registry.peers(None).unwrap_err();
        assert!(matches!(err, WsError::RegistryMisuse { .. }));
    }

    #[test]
    fn test_wildcard_unseen_segment_is_empty() {
        let registry = TestRegistry::wildcard();
        assert!(registry.peers(Some("nobody")).unwrap().is_empty());
    }

    #[test]
    fn test_wildcard_insert_without_segment_is_misuse() {
        let registry = TestRegistry::wildcard();
        let err = registry.insert(record("/chat", "/chat")).unwrap_err();
        assert!(matches!(err, WsError::RegistryMisuse { .. }));
    }

    #[test]
    fn test_empty_registry() {
        let registry = TestRegistry::flat();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.segments().is_empty());
    }
}
