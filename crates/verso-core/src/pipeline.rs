//! The per-request dispatch pipeline
//!
//! One request walks the stages in order: extract the requested version,
//! resolve it against the bundle's available revisions, run the resolved
//! revision's middleware chain, validate the input, invoke the handler.
//! Every failure, from any stage, is converted to the JSON error envelope
//! here and nowhere else; nothing propagates past this boundary into the
//! transport.

use crate::bundle::BundleTable;
use crate::error::{ApiError, ErrorPolicy};
use crate::extract::VersionExtractor;
use crate::middleware::Next;
use crate::registry::RouteRegistry;
use crate::request::{Request, VersionContext};
use crate::resolve;
use crate::response::Response;
use crate::route::Method;
use crate::validate::{Issue, RawInput, ValidatedInput};
use crate::version::{Version, VersionHistory};
use bytes::Bytes;
use http::request::Parts;
use http::{header, HeaderName, HeaderValue, StatusCode};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Response header naming the revision that actually served the request.
fn resolved_version_header() -> HeaderName {
    HeaderName::from_static("api-version")
}

/// The frozen state shared by every request.
pub(crate) struct AppCore {
    pub(crate) history: VersionHistory,
    pub(crate) extractor: VersionExtractor,
    pub(crate) registry: RouteRegistry,
    pub(crate) bundles: BundleTable,
    pub(crate) policy: ErrorPolicy,
}

/// Run one request through every stage and produce the response.
pub(crate) async fn dispatch(core: &AppCore, parts: Parts, body: Bytes) -> Response {
    let method = parts.method.clone();
    let path = parts.uri.path().to_string();
    let started = std::time::Instant::now();

    let response = match run(core, parts, body).await {
        Ok(response) => response,
        Err(err) => {
            debug!(kind = err.kind().as_str(), message = %err.message(), "request failed");
            err.to_response(&core.policy)
        }
    };

    log_request(&method, &path, response.status(), started);
    response
}

async fn run(core: &AppCore, parts: Parts, body: Bytes) -> Result<Response, ApiError> {
    // Path match against the transport-level matcher.
    let Some((params, methods)) = core.bundles.match_path(parts.uri.path()) else {
        return Err(ApiError::route_not_found(format!(
            "no route for {} {}",
            parts.method,
            parts.uri.path()
        )));
    };

    // Method lookup inside the matched path slot.
    let bundle_idx = Method::from_http(&parts.method).and_then(|m| methods.get(&m).copied());
    let Some(bundle_idx) = bundle_idx else {
        let mut allowed: Vec<&str> = methods.keys().map(Method::as_str).collect();
        allowed.sort_unstable();
        let mut response = ApiError::method_not_allowed(format!(
            "method {} not allowed for {}",
            parts.method,
            parts.uri.path()
        ))
        .to_response(&core.policy);
        if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
            response.headers_mut().insert(header::ALLOW, value);
        }
        return Ok(response);
    };
    let bundle = core.bundles.bundle(bundle_idx);

    // ExtractVersion + ResolveVersion.
    let version = if bundle.is_unversioned() {
        None
    } else {
        let requested = core
            .extractor
            .extract(&parts)
            .map(Version::from)
            .or_else(|| core.history.latest().cloned())
            .ok_or_else(|| {
                ApiError::version_not_resolved(
                    "no version requested and the version history is empty",
                )
            })?;

        let resolved = match core.extractor.parse_date_fn() {
            None => resolve::lexicographic(&core.history, bundle.available(), &requested),
            Some(parse) => {
                resolve::date_aware(&core.history, bundle.available(), &requested, &**parse)
            }
        }
        .ok_or_else(|| {
            ApiError::version_not_resolved(format!(
                "no revision of {} {} serves version '{}'",
                bundle.method(),
                bundle.path(),
                requested
            ))
        })?;

        Some(VersionContext {
            requested,
            resolved,
        })
    };

    let entry = match &version {
        Some(ctx) => bundle.entry_for(&ctx.resolved),
        None => bundle.entries().first(),
    }
    .expect("resolved version is a bundle member")
    .clone();

    // GET and DELETE never forward a body.
    let body = if entry.route().method().allows_body() && !body.is_empty() {
        Some(body)
    } else {
        None
    };
    let request = Request::new(parts, body, params, version.clone());

    // Innermost stage: validate, then invoke the handler.
    let chain = entry.middleware().clone();
    let policy = core.policy.clone();
    let terminal: Next = Arc::new(move |mut req: Request| {
        let entry = entry.clone();
        let policy = policy.clone();
        Box::pin(async move {
            let raw = match raw_input(&mut req) {
                Ok(raw) => raw,
                Err(err) => return err.to_response(&policy),
            };
            let input = match entry.route().validator() {
                Some(validator) => match validator.validate(&raw).await {
                    Ok(input) => input,
                    Err(issues) => return ApiError::validation(issues).to_response(&policy),
                },
                None => ValidatedInput::passthrough(&raw),
            };
            match entry.handler.call(req, input).await {
                Ok(response) => response,
                Err(err) => {
                    debug!(kind = err.kind().as_str(), message = %err.message(), "handler failed");
                    err.to_response(&policy)
                }
            }
        })
    });

    let mut response = chain.execute(request, terminal).await;

    if let Some(ctx) = &version {
        if let Ok(value) = HeaderValue::from_str(ctx.resolved.as_str()) {
            response
                .headers_mut()
                .insert(resolved_version_header(), value);
        }
    }
    Ok(response)
}

/// Assemble the validator's input bag from the request, consuming the body.
fn raw_input(req: &mut Request) -> Result<RawInput, ApiError> {
    let params = req.params().clone();

    let query = req
        .query_string()
        .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
        .unwrap_or_default()
        .into_iter()
        .collect();

    let headers = req
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let body = match req.take_body() {
        Some(bytes) if !bytes.is_empty() => Some(serde_json::from_slice(&bytes).map_err(|err| {
            ApiError::validation(vec![Issue::new("body", format!("invalid JSON: {err}"))])
        })?),
        _ => None,
    };

    Ok(RawInput {
        params,
        query,
        headers,
        body,
    })
}

fn log_request(
    method: &http::Method,
    path: &str,
    status: StatusCode,
    started: std::time::Instant,
) {
    let elapsed = started.elapsed();
    if status.is_server_error() {
        error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %elapsed.as_millis(),
            "request failed"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %elapsed.as_millis(),
            "request completed"
        );
    }
}
