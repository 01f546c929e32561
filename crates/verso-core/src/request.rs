//! Request types
//!
//! [`Request`] wraps the transport request head, the buffered body, the path
//! parameters extracted by the matcher, and, once resolution has run, the
//! per-request [`VersionContext`]. One instance exists per request; nothing
//! is shared across requests.

use crate::version::Version;
use bytes::Bytes;
use http::{request::Parts, HeaderMap, Method as HttpMethod, Uri};
use std::collections::HashMap;

/// The versions in play for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionContext {
    /// What the client asked for (or the newest release when it asked for
    /// nothing).
    pub requested: Version,
    /// The revision actually executed, possibly older than requested.
    pub resolved: Version,
}

/// An in-flight HTTP request as seen by middleware and handlers.
pub struct Request {
    pub(crate) parts: Parts,
    pub(crate) body: Option<Bytes>,
    pub(crate) params: HashMap<String, String>,
    pub(crate) version: Option<VersionContext>,
}

impl Request {
    pub(crate) fn new(
        parts: Parts,
        body: Option<Bytes>,
        params: HashMap<String, String>,
        version: Option<VersionContext>,
    ) -> Self {
        Self {
            parts,
            body,
            params,
            version,
        }
    }

    /// The transport-level method.
    pub fn method(&self) -> &HttpMethod {
        &self.parts.method
    }

    /// The full request URI.
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// The request path.
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// The raw query string, if any.
    pub fn query_string(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// All path parameters.
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// One path parameter by placeholder name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// The version context, absent for unversioned route bags.
    pub fn version(&self) -> Option<&VersionContext> {
        self.version.as_ref()
    }

    /// Take the buffered body. Can only be taken once; GET and DELETE
    /// requests never carry one.
    pub fn take_body(&mut self) -> Option<Bytes> {
        self.body.take()
    }

    /// Peek at the buffered body without consuming it.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("version", &self.version)
            .finish()
    }
}
