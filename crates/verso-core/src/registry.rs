//! The route registry
//!
//! Keyed store mapping (method, path, version) to its [`RouteDefinition`].
//! At most one definition per exact triple; registering a duplicate fails
//! with a descriptive error instead of silently overwriting. Iteration is
//! deterministic (sorted by key) so documentation generation sees a stable
//! order. The registry is append-only during startup and read-only once the
//! router is finished.

use crate::route::{Method, RouteDefinition};
use crate::version::Version;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Errors raised while registering routes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The exact (method, path, version) triple already exists.
    #[error("route {method} {path} version '{version}' is already registered")]
    Duplicate {
        /// Method of the offending registration.
        method: Method,
        /// Normalized path template.
        path: String,
        /// The duplicated version.
        version: Version,
    },

    /// The route's version is not an entry of the version history.
    #[error("version '{version}' of route {method} {path} is not in the version history")]
    UnknownVersion {
        /// Method of the offending registration.
        method: Method,
        /// Normalized path template.
        path: String,
        /// The unknown version.
        version: Version,
    },

    /// A versioned router requires every route to carry a version.
    #[error("route {method} {path} needs a version: the router has a version history")]
    MissingVersion {
        /// Method of the offending registration.
        method: Method,
        /// Normalized path template.
        path: String,
    },

    /// The path template was rejected by the matcher.
    #[error("invalid path template '{path}': {reason}")]
    InvalidPath {
        /// The offending template.
        path: String,
        /// Matcher diagnostic.
        reason: String,
    },
}

/// Composite registry key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteKey {
    /// HTTP method.
    pub method: Method,
    /// Normalized path template.
    pub path: String,
    /// Version identifier (unversioned sentinel allowed).
    pub version: Version,
}

/// The (method, path, version) → route store.
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    routes: BTreeMap<RouteKey, Arc<RouteDefinition>>,
}

impl RouteRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, route: Arc<RouteDefinition>) -> Result<(), RegistryError> {
        let key = RouteKey {
            method: route.method(),
            path: route.path().to_string(),
            version: route.version().clone(),
        };
        if self.routes.contains_key(&key) {
            return Err(RegistryError::Duplicate {
                method: key.method,
                path: key.path,
                version: key.version,
            });
        }
        self.routes.insert(key, route);
        Ok(())
    }

    /// Look up one exact triple.
    pub fn get(&self, method: Method, path: &str, version: &Version) -> Option<&Arc<RouteDefinition>> {
        self.routes.get(&RouteKey {
            method,
            path: path.to_string(),
            version: version.clone(),
        })
    }

    /// Iterate every entry in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&RouteKey, &Arc<RouteDefinition>)> {
        self.routes.iter()
    }

    /// All versions registered for one (method, path), in key order.
    pub fn versions_for(&self, method: Method, path: &str) -> Vec<&Version> {
        self.routes
            .iter()
            .filter(|(key, _)| key.method == method && key.path == path)
            .map(|(key, _)| &key.version)
            .collect()
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteMeta;

    fn route(method: Method, path: &str, version: &str) -> Arc<RouteDefinition> {
        Arc::new(RouteDefinition::new(
            method,
            path.to_string(),
            Version::from(version),
            None,
            RouteMeta::default(),
        ))
    }

    #[test]
    fn duplicate_triple_is_rejected() {
        let mut registry = RouteRegistry::new();
        registry
            .insert(route(Method::Get, "/users/:id", "2024-01-01"))
            .unwrap();

        let err = registry
            .insert(route(Method::Get, "/users/:id", "2024-01-01"))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Duplicate {
                method: Method::Get,
                path: "/users/:id".to_string(),
                version: Version::from("2024-01-01"),
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn same_path_different_version_or_method_coexist() {
        let mut registry = RouteRegistry::new();
        registry
            .insert(route(Method::Get, "/users/:id", "2024-01-01"))
            .unwrap();
        registry
            .insert(route(Method::Get, "/users/:id", "2024-02-01"))
            .unwrap();
        registry
            .insert(route(Method::Delete, "/users/:id", "2024-01-01"))
            .unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.versions_for(Method::Get, "/users/:id"),
            vec![&Version::from("2024-01-01"), &Version::from("2024-02-01")]
        );
    }

    #[test]
    fn lookup_by_exact_triple() {
        let mut registry = RouteRegistry::new();
        registry
            .insert(route(Method::Get, "/users/:id", "2024-01-01"))
            .unwrap();

        assert!(registry
            .get(Method::Get, "/users/:id", &Version::from("2024-01-01"))
            .is_some());
        assert!(registry
            .get(Method::Get, "/users/:id", &Version::from("2024-02-01"))
            .is_none());
        assert!(registry
            .get(Method::Post, "/users/:id", &Version::from("2024-01-01"))
            .is_none());
    }

    #[test]
    fn iteration_is_deterministic() {
        let mut registry = RouteRegistry::new();
        registry
            .insert(route(Method::Post, "/b", "2024-02-01"))
            .unwrap();
        registry
            .insert(route(Method::Get, "/a", "2024-01-01"))
            .unwrap();
        registry
            .insert(route(Method::Get, "/a", "2024-02-01"))
            .unwrap();

        let keys: Vec<String> = registry
            .iter()
            .map(|(key, _)| format!("{} {} {}", key.method, key.path, key.version))
            .collect();
        assert_eq!(
            keys,
            vec![
                "GET /a 2024-01-01",
                "GET /a 2024-02-01",
                "POST /b 2024-02-01",
            ]
        );
    }
}
