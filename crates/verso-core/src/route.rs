//! Route definitions
//!
//! A [`RouteDefinition`] is one immutable revision of an endpoint: method,
//! path template, version identifier, optional input validator, and opaque
//! documentation metadata. Definitions are created once at registration time
//! and owned by the registry; nothing mutates them afterwards.

use crate::validate::Validator;
use crate::version::Version;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// The HTTP methods routes can be registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl Method {
    /// Every supported method, in a fixed order.
    pub const ALL: [Method; 5] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
    ];

    /// Uppercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Map from the transport-level method, if supported.
    pub fn from_http(method: &http::Method) -> Option<Self> {
        match *method {
            http::Method::GET => Some(Method::Get),
            http::Method::POST => Some(Method::Post),
            http::Method::PUT => Some(Method::Put),
            http::Method::PATCH => Some(Method::Patch),
            http::Method::DELETE => Some(Method::Delete),
            _ => None,
        }
    }

    /// Whether requests with this method carry a body into the pipeline.
    ///
    /// GET and DELETE bodies are dropped before validation and the handler,
    /// even when a client sends one.
    pub fn allows_body(&self) -> bool {
        !matches!(self, Method::Get | Method::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque documentation metadata attached to a route revision.
///
/// The dispatch runtime never reads this; the OpenAPI exporter does.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RouteMeta {
    /// Short one-line summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Longer description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Grouping tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Free-form payload for anything else.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl RouteMeta {
    /// Whether no metadata was attached at all.
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.description.is_none()
            && self.tags.is_empty()
            && self.extra.is_none()
    }
}

/// One immutable revision of an endpoint.
pub struct RouteDefinition {
    method: Method,
    path: String,
    version: Version,
    validator: Option<Arc<dyn Validator>>,
    meta: RouteMeta,
}

impl RouteDefinition {
    pub(crate) fn new(
        method: Method,
        path: String,
        version: Version,
        validator: Option<Arc<dyn Validator>>,
        meta: RouteMeta,
    ) -> Self {
        Self {
            method,
            path,
            version,
            validator,
            meta,
        }
    }

    /// The HTTP method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// The normalized path template (`/users/:userId`).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The version identifier this revision was registered under.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// The input validator, if any.
    pub fn validator(&self) -> Option<&Arc<dyn Validator>> {
        self.validator.as_ref()
    }

    /// Documentation metadata.
    pub fn meta(&self) -> &RouteMeta {
        &self.meta
    }

    /// Names of the `:name` placeholders in the path template, in order.
    pub fn path_params(&self) -> Vec<&str> {
        self.path
            .split('/')
            .filter_map(|segment| segment.strip_prefix(':'))
            .collect()
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("version", &self.version)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}
