//! Router composition and route registration
//!
//! A [`Router`] node owns a path prefix, its middleware list, and a handle
//! to the shared registration core (registry, bundle table, history,
//! extractor, error policy). [`Router::branch`] creates a child scoped to
//! `prefix + subpath` that shares the core but owns its own middleware
//! additions: layers added on a branch apply to routes registered at or
//! below it and are invisible to siblings and ancestors.
//!
//! Registration happens once, at startup, on one thread. [`Router::finish`]
//! freezes the core into an immutable [`App`] that serves requests without
//! locking.

use crate::bundle::{BundleTable, RouteBundle};
use crate::error::ErrorPolicy;
use crate::extract::VersionExtractor;
use crate::handler::Handler;
use crate::middleware::{Middleware, MiddlewareChain};
use crate::pipeline::{self, AppCore};
use crate::registry::{RegistryError, RouteRegistry};
use crate::request::Request;
use crate::response::Response;
use crate::route::{Method, RouteDefinition, RouteMeta};
use crate::validate::Validator;
use crate::version::{Version, VersionHistory};
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

struct Shared {
    history: VersionHistory,
    extractor: VersionExtractor,
    registry: RouteRegistry,
    bundles: BundleTable,
    policy: ErrorPolicy,
}

/// A composable router node.
pub struct Router {
    shared: Arc<Mutex<Shared>>,
    prefix: String,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Router {
    /// A versioned router: routes must register versions from `history`,
    /// and `extractor` decides how requests name the version they want.
    pub fn new(history: VersionHistory, extractor: VersionExtractor) -> Self {
        init_tracing();
        Self {
            shared: Arc::new(Mutex::new(Shared {
                history,
                extractor,
                registry: RouteRegistry::new(),
                bundles: BundleTable::new(),
                policy: ErrorPolicy::default(),
            })),
            prefix: "/".to_string(),
            middleware: Vec::new(),
        }
    }

    /// A router with no versioning: routes carry no version and requests
    /// are dispatched without a version context.
    pub fn unversioned() -> Self {
        Self::new(VersionHistory::empty(), VersionExtractor::none())
    }

    /// Replace the error-kind → status mapping.
    pub fn error_policy(self, policy: ErrorPolicy) -> Self {
        self.lock().policy = policy;
        self
    }

    /// Append a middleware layer. It applies to every route registered on
    /// this node or its descendants from now on.
    pub fn middleware<M: Middleware>(mut self, layer: M) -> Self {
        self.middleware.push(Arc::new(layer));
        self
    }

    /// Create a child router scoped to `prefix + subpath`.
    ///
    /// The child shares the registration core and starts with a copy of
    /// this node's middleware list; layers it adds stay its own.
    pub fn branch(&self, subpath: &str) -> Router {
        Router {
            shared: self.shared.clone(),
            prefix: join_paths(&self.prefix, subpath),
            middleware: self.middleware.clone(),
        }
    }

    /// Begin registering a GET route.
    pub fn get(&self, path: &str) -> Endpoint<'_> {
        Endpoint::new(self, Method::Get, path)
    }

    /// Begin registering a POST route.
    pub fn post(&self, path: &str) -> Endpoint<'_> {
        Endpoint::new(self, Method::Post, path)
    }

    /// Begin registering a PUT route.
    pub fn put(&self, path: &str) -> Endpoint<'_> {
        Endpoint::new(self, Method::Put, path)
    }

    /// Begin registering a PATCH route.
    pub fn patch(&self, path: &str) -> Endpoint<'_> {
        Endpoint::new(self, Method::Patch, path)
    }

    /// Begin registering a DELETE route.
    pub fn delete(&self, path: &str) -> Endpoint<'_> {
        Endpoint::new(self, Method::Delete, path)
    }

    /// Freeze the registration core into an immutable, shareable [`App`].
    ///
    /// Registrations performed after this call do not affect the returned
    /// app.
    pub fn finish(&self) -> App {
        let shared = self.lock();
        tracing::info!(
            routes = shared.registry.len(),
            paths = shared.bundles.transport_installs().len(),
            "router finished"
        );
        App {
            core: Arc::new(AppCore {
                history: shared.history.clone(),
                extractor: shared.extractor.clone(),
                registry: shared.registry.clone(),
                bundles: shared.bundles.clone(),
                policy: shared.policy.clone(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().expect("router core lock poisoned")
    }
}

/// In-progress registration of one route revision.
///
/// Accumulates the optional pieces (version, validator, metadata) and
/// validates everything once at the terminal [`Endpoint::handle`] call.
pub struct Endpoint<'r> {
    router: &'r Router,
    method: Method,
    path: String,
    version: Option<Version>,
    validator: Option<Arc<dyn Validator>>,
    meta: RouteMeta,
}

impl<'r> Endpoint<'r> {
    fn new(router: &'r Router, method: Method, path: &str) -> Self {
        Self {
            router,
            method,
            path: path.to_string(),
            version: None,
            validator: None,
            meta: RouteMeta::default(),
        }
    }

    /// The version this revision belongs to. Must be a history entry.
    pub fn version(mut self, version: impl Into<Version>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Attach an input validator.
    pub fn validator<V: Validator>(mut self, validator: V) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Attach an already-shared validator.
    pub fn validator_arc(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// One-line documentation summary.
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.meta.summary = Some(summary.into());
        self
    }

    /// Longer documentation description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }

    /// Add a documentation tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.meta.tags.push(tag.into());
        self
    }

    /// Attach free-form documentation payload.
    pub fn meta_extra(mut self, extra: serde_json::Value) -> Self {
        self.meta.extra = Some(extra);
        self
    }

    /// Validate and register the revision with its handler.
    pub fn handle<H: Handler>(self, handler: H) -> Result<(), RegistryError> {
        let path = join_paths(&self.router.prefix, &self.path);
        let mut shared = self.router.lock();

        let version = self.version.unwrap_or_else(Version::unversioned);
        if shared.history.is_empty() {
            if !version.is_unversioned() {
                return Err(RegistryError::UnknownVersion {
                    method: self.method,
                    path,
                    version,
                });
            }
        } else if version.is_unversioned() {
            return Err(RegistryError::MissingVersion {
                method: self.method,
                path,
            });
        } else if !shared.history.contains(&version) {
            return Err(RegistryError::UnknownVersion {
                method: self.method,
                path,
                version,
            });
        }

        let route = Arc::new(RouteDefinition::new(
            self.method,
            path,
            version,
            self.validator,
            self.meta,
        ));
        let chain = MiddlewareChain::from_layers(self.router.middleware.clone());
        shared.bundles.register(route.clone(), Arc::new(handler), chain)?;
        shared.registry.insert(route.clone())?;

        tracing::debug!(
            method = %route.method(),
            path = %route.path(),
            version = %route.version(),
            "route registered"
        );
        Ok(())
    }
}

/// The frozen dispatch core produced by [`Router::finish`].
#[derive(Clone)]
pub struct App {
    core: Arc<AppCore>,
}

impl App {
    /// Run one request through the dispatch pipeline.
    pub async fn handle(&self, req: http::Request<Bytes>) -> Response {
        let (parts, body) = req.into_parts();
        pipeline::dispatch(&self.core, parts, body).await
    }

    /// The read-only route registry.
    pub fn registry(&self) -> &RouteRegistry {
        &self.core.registry
    }

    /// The version history.
    pub fn history(&self) -> &VersionHistory {
        &self.core.history
    }

    /// All revisions registered for one (method, path template).
    pub fn bundle(&self, method: Method, path: &str) -> Option<&RouteBundle> {
        self.core.bundles.bundle_for(method, path)
    }

    /// The transport-level matcher installs performed during registration,
    /// one per (method, path) regardless of revision count.
    pub fn transport_registrations(&self) -> &[(Method, String)] {
        self.core.bundles.transport_installs()
    }

    pub(crate) fn core(&self) -> &Arc<AppCore> {
        &self.core
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,verso_core=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Join a prefix and a subpath, collapsing duplicate slashes and stripping
/// a trailing slash. Placeholder segments pass through untouched.
pub(crate) fn join_paths(prefix: &str, path: &str) -> String {
    normalize_path(&format!("{prefix}/{path}"))
}

/// Normalize a path template: exactly one leading slash, no duplicate or
/// trailing slashes.
pub(crate) fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::with_capacity(path.len());
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Normalized paths start with exactly one slash, never end with
        /// one, and contain no doubled slashes.
        #[test]
        fn normalized_paths_are_canonical(
            leading in prop::collection::vec(Just('/'), 0..4),
            segments in prop::collection::vec("[a-z:][a-z0-9]{0,6}", 0..5),
            trailing in prop::collection::vec(Just('/'), 0..4),
        ) {
            let mut raw = String::new();
            raw.extend(leading);
            raw.push_str(&segments.join("/"));
            raw.extend(trailing);

            let normalized = normalize_path(&raw);

            prop_assert!(normalized.starts_with('/'));
            prop_assert!(!normalized.contains("//"));
            prop_assert!(normalized == "/" || !normalized.ends_with('/'));
        }

        /// Joining preserves every segment of both operands, in order.
        #[test]
        fn join_preserves_segments(
            prefix_segments in prop::collection::vec("[a-z][a-z0-9]{0,6}", 0..4),
            path_segments in prop::collection::vec("[a-z][a-z0-9]{0,6}", 0..4),
        ) {
            let prefix = format!("/{}", prefix_segments.join("/"));
            let path = format!("/{}", path_segments.join("/"));
            let joined = join_paths(&prefix, &path);

            let expected: Vec<&str> = prefix_segments
                .iter()
                .chain(path_segments.iter())
                .map(String::as_str)
                .collect();
            let actual: Vec<&str> = joined
                .split('/')
                .filter(|s| !s.is_empty())
                .collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
