//! Origin policy for upgrade requests.
//!
//! A pure predicate over the request's `origin` header. The policy does
//! not authenticate the server's own authority or `host` header; that is
//! outside the engine's scope.

use std::collections::HashSet;

/// Decides whether an upgrade request's origin is acceptable.
///
/// The decision table:
///
/// | origin header | allow-list | require_origin | result       |
/// |---------------|------------|----------------|--------------|
/// | present       | configured | any            | membership   |
/// | absent        | any        | true           | deny         |
/// | otherwise     |            |                | allow        |
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    allowed: Option<HashSet<String>>,
    require_origin: bool,
}

impl OriginPolicy {
    /// A policy that accepts any origin, present or not.
    pub fn allow_any() -> Self {
        Self::default()
    }

    /// A policy restricted to the given origins.
    pub fn allow_list<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Some(origins.into_iter().map(Into::into).collect()),
            require_origin: false,
        }
    }

    /// Set whether an `origin` header must be present at all.
    pub fn require_origin(mut self, required: bool) -> Self {
        self.require_origin = required;
        self
    }

    /// Whether an allow-list is configured.
    pub fn has_allow_list(&self) -> bool {
        self.allowed.is_some()
    }

    /// Evaluate the policy against a request origin.
    pub fn allows(&self, origin: Option<&str>) -> bool {
        match (origin, &self.allowed) {
            (Some(origin), Some(allowed)) => allowed.contains(origin),
            (None, _) => !self.require_origin,
            (Some(_), None) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_any_accepts_everything() {
        let policy = OriginPolicy::allow_any();
        assert!(policy.allows(Some("https://a.example")));
        assert!(policy.allows(None));
    }

    #[test]
    fn test_allow_list_membership() {
        let policy = OriginPolicy::allow_list(["https://a.example"]);
        assert!(policy.allows(Some("https://a.example")));
        assert!(!policy.allows(Some("https://b.example")));
    }

    #[test]
    fn test_allow_list_without_origin_is_accepted() {
        // Absent origin with no require_origin flag passes even when an
        // allow-list is configured.
        let policy = OriginPolicy::allow_list(["https://a.example"]);
        assert!(policy.allows(None));
    }

    #[test]
    fn test_require_origin_rejects_absent() {
        let policy = OriginPolicy::allow_any().require_origin(true);
        assert!(!policy.allows(None));
        assert!(policy.allows(Some("https://a.example")));
    }

    #[test]
    fn test_require_origin_with_allow_list() {
        let policy = OriginPolicy::allow_list(["https://a.example"]).require_origin(true);
        assert!(!policy.allows(None));
        assert!(policy.allows(Some("https://a.example")));
        assert!(!policy.allows(Some("https://b.example")));
    }
}
