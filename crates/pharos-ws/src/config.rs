//! Server configuration.
//!
//! Configuration is assembled through a builder and validated when
//! [`ServerConfigBuilder::build`] runs: a malformed route pattern is
//! rejected at construction time, never at request time.

use pharos_route::RoutePattern;

use crate::error::WsResult;
use crate::origin::OriginPolicy;

/// Immutable per-server configuration.
///
/// # Example
///
/// ```rust
/// use pharos_ws::ServerConfig;
///
/// let config = ServerConfig::builder("/chat/:room")
///     .allowed_origins(["https://app.example"])
///     .subprotocols(["chatv2", "chatv1"])
///     .build()?;
///
/// assert!(config.route().is_wildcard());
/// # Ok::<(), pharos_ws::WsError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    route: RoutePattern,
    origin_policy: OriginPolicy,
    subprotocols: Option<Vec<String>>,
    no_server: bool,
}

impl ServerConfig {
    /// Start building a configuration for the given route pattern.
    pub fn builder(route: impl Into<String>) -> ServerConfigBuilder {
        ServerConfigBuilder {
            route: route.into(),
            origin_policy: OriginPolicy::allow_any(),
            subprotocols: None,
            no_server: false,
        }
    }

    /// The route pattern this server answers on.
    pub fn route(&self) -> &RoutePattern {
        &self.route
    }

    /// The origin policy applied during validation.
    pub fn origin_policy(&self) -> &OriginPolicy {
        &self.origin_policy
    }

    /// The subprotocols this server supports, in server order, if any.
    pub fn subprotocols(&self) -> Option<&[String]> {
        self.subprotocols.as_deref()
    }

    /// Whether the engine expects upgrade events to be delivered
    /// externally instead of binding a listener itself.
    ///
    /// The engine never binds a transport either way; this flag exists
    /// so embedders can record the deployment mode in one place.
    pub fn no_server(&self) -> bool {
        self.no_server
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    route: String,
    origin_policy: OriginPolicy,
    subprotocols: Option<Vec<String>>,
    no_server: bool,
}

impl ServerConfigBuilder {
    /// Restrict accepted origins to the given allow-list.
    pub fn allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let require = !self.origin_policy.allows(None);
        self.origin_policy = OriginPolicy::allow_list(origins).require_origin(require);
        self
    }

    /// Require an `origin` header to be present (default: false).
    pub fn require_origin(mut self, required: bool) -> Self {
        self.origin_policy = self.origin_policy.clone().require_origin(required);
        self
    }

    /// Set the supported subprotocols, in server preference order.
    pub fn subprotocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subprotocols = Some(protocols.into_iter().map(Into::into).collect());
        self
    }

    /// Mark that upgrade events are delivered externally (default: false).
    pub fn no_server(mut self, no_server: bool) -> Self {
        self.no_server = no_server;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WsError::InvalidPattern`](crate::WsError::InvalidPattern)
    /// when the route pattern is malformed (for example a wildcard marker
    /// that does not immediately follow the final `/`).
    pub fn build(self) -> WsResult<ServerConfig> {
        let route = RoutePattern::parse(self.route)?;
        Ok(ServerConfig {
            route,
            origin_policy: self.origin_policy,
            subprotocols: self.subprotocols,
            no_server: self.no_server,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_literal_route() {
        let config = ServerConfig::builder("/chat").build().unwrap();
        assert_eq!(config.route().as_str(), "/chat");
        assert!(!config.route().is_wildcard());
        assert!(!config.no_server());
        assert_eq!(config.subprotocols(), None);
    }

    #[test]
    fn test_build_wildcard_route() {
        let config = ServerConfig::builder("/chat/:room").build().unwrap();
        assert!(config.route().is_wildcard());
    }

    #[test]
    fn test_build_rejects_malformed_pattern() {
        let result = ServerConfig::builder("/a/:b/c").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_origin_options() {
        let config = ServerConfig::builder("/chat")
            .allowed_origins(["https://a.example"])
            .require_origin(true)
            .build()
            .unwrap();

        assert!(config.origin_policy().allows(Some("https://a.example")));
        assert!(!config.origin_policy().allows(Some("https://b.example")));
        assert!(!config.origin_policy().allows(None));
    }

    #[test]
    fn test_require_origin_before_allow_list_is_kept() {
        let config = ServerConfig::builder("/chat")
            .require_origin(true)
            .allowed_origins(["https://a.example"])
            .build()
            .unwrap();
        assert!(!config.origin_policy().allows(None));
    }

    #[test]
    fn test_subprotocols_preserve_order() {
        let config = ServerConfig::builder("/chat")
            .subprotocols(["chatv2", "chatv1"])
            .build()
            .unwrap();
        assert_eq!(
            config.subprotocols(),
            Some(&["chatv2".to_string(), "chatv1".to_string()][..])
        );
    }
}
