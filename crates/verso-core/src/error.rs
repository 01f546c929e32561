//! Request-path error model
//!
//! Every failure inside the dispatch pipeline becomes an [`ApiError`] and is
//! converted into the JSON error envelope at a single boundary. The mapping
//! from error kind to status code lives in [`ErrorPolicy`] and is explicit
//! and overridable rather than hard-coded.

use crate::validate::Issue;
use bytes::Bytes;
use http::{header, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::response::Response;

/// Result alias for handlers.
pub type Result<T, E = ApiError> = std::result::Result<T, E>;

/// The failure classes the pipeline distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No bundle exists for the requested path.
    RouteNotFound,
    /// The path exists but not under the requested method.
    MethodNotAllowed,
    /// Version resolution produced no revision for the requested version.
    VersionNotResolved,
    /// The route's validator rejected the input.
    ValidationFailed,
    /// A middleware or handler failed.
    Handler,
}

impl ErrorKind {
    /// Stable identifier used in the error envelope.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RouteNotFound => "route_not_found",
            ErrorKind::MethodNotAllowed => "method_not_allowed",
            ErrorKind::VersionNotResolved => "version_not_resolved",
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::Handler => "handler_error",
        }
    }
}

/// Kind-to-status mapping applied at the pipeline boundary.
///
/// Defaults: 404 for unknown routes, 405 for unknown methods, 400 for
/// unresolvable versions, 422 for validation failures, 500 for handler
/// failures. Individual kinds can be remapped on the router builder.
#[derive(Debug, Clone)]
pub struct ErrorPolicy {
    overrides: HashMap<ErrorKind, StatusCode>,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }
}

impl ErrorPolicy {
    /// The default mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remap one error kind to a different status code.
    pub fn map(mut self, kind: ErrorKind, status: StatusCode) -> Self {
        self.overrides.insert(kind, status);
        self
    }

    /// Status code for a kind under this policy.
    pub fn status_for(&self, kind: ErrorKind) -> StatusCode {
        if let Some(status) = self.overrides.get(&kind) {
            return *status;
        }
        match kind {
            ErrorKind::RouteNotFound => StatusCode::NOT_FOUND,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::VersionNotResolved => StatusCode::BAD_REQUEST,
            ErrorKind::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Handler => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A pipeline failure with its structured payload.
///
/// Carries only what may be shown to clients; internal detail belongs in
/// logs, never in the envelope.
#[derive(Debug, Clone)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    issues: Vec<Issue>,
    status: Option<StatusCode>,
}

impl ApiError {
    /// A failure of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            issues: Vec::new(),
            status: None,
        }
    }

    /// No route registered at the path.
    pub fn route_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RouteNotFound, message)
    }

    /// Path known, method not registered.
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotAllowed, message)
    }

    /// No revision resolvable for the requested version.
    pub fn version_not_resolved(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::VersionNotResolved, message)
    }

    /// Validator rejection carrying the field issues.
    pub fn validation(issues: Vec<Issue>) -> Self {
        Self {
            kind: ErrorKind::ValidationFailed,
            message: "request validation failed".to_string(),
            issues,
            status: None,
        }
    }

    /// Failure inside middleware or a handler.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Handler, message)
    }

    /// Force a specific status code, bypassing the policy for this error.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// The failure class.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The client-visible message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Field issues, non-empty only for validation failures.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Render the JSON envelope under the given policy.
    pub fn to_response(&self, policy: &ErrorPolicy) -> Response {
        let status = self.status.unwrap_or_else(|| policy.status_for(self.kind));
        let envelope = Envelope {
            error: EnvelopeBody {
                error_type: self.kind.as_str(),
                message: &self.message,
                issues: if self.issues.is_empty() {
                    None
                } else {
                    Some(&self.issues)
                },
            },
        };
        let body = serde_json::to_vec(&envelope).unwrap_or_else(|_| b"{}".to_vec());
        http::Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))
            .unwrap()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::handler(format!("JSON error: {err}"))
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    error: EnvelopeBody<'a>,
}

#[derive(Serialize)]
struct EnvelopeBody<'a> {
    #[serde(rename = "type")]
    error_type: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    issues: Option<&'a [Issue]>,
}
