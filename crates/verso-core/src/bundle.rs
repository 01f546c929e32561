//! The route bundle table
//!
//! A [`RouteBundle`] groups every registered revision of one (method, path)
//! pair together with each revision's handler and middleware chain. The
//! table wires a path into the transport-level matcher exactly once, the
//! first time any revision of a (method, path) is registered, and absorbs
//! every later revision in memory. Version selection never touches the
//! matcher; it happens in the dispatch pipeline against the bundle.

use crate::handler::BoxedHandler;
use crate::middleware::MiddlewareChain;
use crate::registry::RegistryError;
use crate::route::{Method, RouteDefinition};
use crate::version::Version;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One revision inside a bundle: the definition plus its runtime pieces.
#[derive(Clone)]
pub struct BundleEntry {
    pub(crate) route: Arc<RouteDefinition>,
    pub(crate) handler: BoxedHandler,
    pub(crate) middleware: MiddlewareChain,
}

impl BundleEntry {
    /// The route definition.
    pub fn route(&self) -> &Arc<RouteDefinition> {
        &self.route
    }

    /// The middleware chain captured at registration time.
    pub fn middleware(&self) -> &MiddlewareChain {
        &self.middleware
    }
}

impl std::fmt::Debug for BundleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleEntry")
            .field("route", &self.route)
            .field("middleware", &self.middleware)
            .finish()
    }
}

/// Every registered revision of one (method, path).
#[derive(Debug, Clone)]
pub struct RouteBundle {
    method: Method,
    path: String,
    entries: Vec<BundleEntry>,
    versions: HashSet<Version>,
    by_version: HashMap<Version, usize>,
}

impl RouteBundle {
    fn new(method: Method, path: String) -> Self {
        Self {
            method,
            path,
            entries: Vec::new(),
            versions: HashSet::new(),
            by_version: HashMap::new(),
        }
    }

    fn push(&mut self, entry: BundleEntry) -> Result<(), RegistryError> {
        let version = entry.route.version().clone();
        if self.versions.contains(&version) {
            return Err(RegistryError::Duplicate {
                method: self.method,
                path: self.path.clone(),
                version,
            });
        }
        self.by_version.insert(version.clone(), self.entries.len());
        self.versions.insert(version);
        self.entries.push(entry);
        Ok(())
    }

    /// The bundle's method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// The bundle's normalized path template.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The set of versions this bundle supports, fed to the resolver.
    pub fn available(&self) -> &HashSet<Version> {
        &self.versions
    }

    /// Revisions in registration order.
    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    /// The revision registered under an exact version.
    pub fn entry_for(&self, version: &Version) -> Option<&BundleEntry> {
        self.by_version
            .get(version)
            .map(|idx| &self.entries[*idx])
    }

    /// Whether this bundle opted out of versioning entirely.
    pub fn is_unversioned(&self) -> bool {
        self.entries.len() == 1 && self.entries[0].route.version().is_unversioned()
    }
}

/// The (method, normalized path) → bundle index feeding the resolver.
#[derive(Clone)]
pub(crate) struct BundleTable {
    matcher: matchit::Router<String>,
    by_path: HashMap<String, HashMap<Method, usize>>,
    bundles: Vec<RouteBundle>,
    installs: Vec<(Method, String)>,
}

impl std::fmt::Debug for BundleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleTable")
            .field("paths", &self.by_path.len())
            .field("bundles", &self.bundles.len())
            .finish()
    }
}

impl BundleTable {
    pub(crate) fn new() -> Self {
        Self {
            matcher: matchit::Router::new(),
            by_path: HashMap::new(),
            bundles: Vec::new(),
            installs: Vec::new(),
        }
    }

    /// Absorb one revision. The first revision of a (method, path) installs
    /// the matcher entry; later ones only extend the bundle.
    pub(crate) fn register(
        &mut self,
        route: Arc<RouteDefinition>,
        handler: BoxedHandler,
        middleware: MiddlewareChain,
    ) -> Result<(), RegistryError> {
        let method = route.method();
        let path = route.path().to_string();

        if !self.by_path.contains_key(&path) {
            self.matcher
                .insert(path.clone(), path.clone())
                .map_err(|err| RegistryError::InvalidPath {
                    path: path.clone(),
                    reason: err.to_string(),
                })?;
            self.by_path.insert(path.clone(), HashMap::new());
        }

        let methods = self
            .by_path
            .get_mut(&path)
            .expect("path slot just ensured");
        let entry = BundleEntry {
            route,
            handler,
            middleware,
        };
        match methods.get(&method) {
            Some(idx) => self.bundles[*idx].push(entry)?,
            None => {
                let mut bundle = RouteBundle::new(method, path.clone());
                bundle.push(entry)?;
                methods.insert(method, self.bundles.len());
                self.bundles.push(bundle);
                self.installs.push((method, path));
            }
        }
        Ok(())
    }

    /// Match a concrete request path, yielding the extracted params and the
    /// per-method bundle indices registered at that path.
    pub(crate) fn match_path(
        &self,
        path: &str,
    ) -> Option<(HashMap<String, String>, &HashMap<Method, usize>)> {
        let matched = self.matcher.at(path).ok()?;
        let params: HashMap<String, String> = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.by_path
            .get(matched.value)
            .map(|methods| (params, methods))
    }

    pub(crate) fn bundle(&self, idx: usize) -> &RouteBundle {
        &self.bundles[idx]
    }

    /// Direct bundle lookup by exact (method, path template).
    pub(crate) fn bundle_for(&self, method: Method, path: &str) -> Option<&RouteBundle> {
        let idx = self.by_path.get(path)?.get(&method)?;
        Some(&self.bundles[*idx])
    }

    /// The transport-level installs performed so far, in order. One entry
    /// per (method, path) no matter how many revisions were registered.
    pub(crate) fn transport_installs(&self) -> &[(Method, String)] {
        &self.installs
    }
}
