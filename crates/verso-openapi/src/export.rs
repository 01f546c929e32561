//! Registry → document export
//!
//! Reads the route registry (never mutating it), resolves exactly one
//! revision per (method, path) for the requested document version using the
//! same resolution engine the dispatch pipeline uses, and emits one
//! operation per resolved revision.

use crate::spec::{
    Document, Info, MediaType, Operation, Parameter, PathItem, RequestBody, ResponseSpec,
    SchemaRef,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use verso_core::resolve;
use verso_core::{Method, RouteDefinition, RouteRegistry, Version, VersionHistory};

/// Build the document describing the API as seen by clients pinned to
/// `doc_version`.
///
/// Each (method, path) contributes at most one operation: the revision the
/// resolver picks for `doc_version`. Bundles with no revision at or below
/// the document version are omitted, exactly as the dispatch pipeline would
/// reject them.
pub fn document(
    registry: &RouteRegistry,
    history: &VersionHistory,
    doc_version: &Version,
    mut info: Info,
) -> Document {
    if info.version.is_empty() {
        info.version = doc_version.to_string();
    }
    let mut doc = Document::new(info);

    for ((method, path), routes) in group_by_endpoint(registry) {
        let available: HashSet<Version> =
            routes.iter().map(|route| route.version().clone()).collect();

        let picked = if routes.len() == 1 && routes[0].version().is_unversioned() {
            Some(&routes[0])
        } else {
            resolve::lexicographic(history, &available, doc_version)
                .and_then(|resolved| routes.iter().find(|route| *route.version() == resolved))
        };
        let Some(route) = picked else { continue };

        let item = doc.paths.entry(openapi_path(&path)).or_default();
        let operation = build_operation(route);
        match method {
            Method::Get => item.get = Some(operation),
            Method::Post => item.post = Some(operation),
            Method::Put => item.put = Some(operation),
            Method::Patch => item.patch = Some(operation),
            Method::Delete => item.delete = Some(operation),
        }
    }

    doc
}

/// Build one document per history entry, oldest first.
pub fn documents_per_version(
    registry: &RouteRegistry,
    history: &VersionHistory,
    info: &Info,
) -> Vec<(Version, Document)> {
    history
        .iter()
        .map(|version| {
            let mut info = info.clone();
            info.version = String::new();
            (
                version.clone(),
                document(registry, history, version, info),
            )
        })
        .collect()
}

fn group_by_endpoint(
    registry: &RouteRegistry,
) -> BTreeMap<(Method, String), Vec<Arc<RouteDefinition>>> {
    let mut groups: BTreeMap<(Method, String), Vec<Arc<RouteDefinition>>> = BTreeMap::new();
    for (key, route) in registry.iter() {
        groups
            .entry((key.method, key.path.clone()))
            .or_default()
            .push(route.clone());
    }
    groups
}

fn build_operation(route: &Arc<RouteDefinition>) -> Operation {
    let meta = route.meta();

    let parameters: Vec<Parameter> = route
        .path_params()
        .into_iter()
        .map(|name| Parameter {
            name: name.to_string(),
            location: "path",
            required: true,
            schema: SchemaRef::string(),
        })
        .collect();

    let request_body = if route.method().allows_body() {
        Some(RequestBody {
            required: false,
            content: BTreeMap::from([(
                "application/json".to_string(),
                MediaType {
                    schema: SchemaRef::object(),
                },
            )]),
        })
    } else {
        None
    };

    let description = meta
        .summary
        .clone()
        .unwrap_or_else(|| "Successful response".to_string());

    Operation {
        summary: meta.summary.clone(),
        description: meta.description.clone(),
        tags: meta.tags.clone(),
        parameters,
        request_body,
        responses: BTreeMap::from([("200".to_string(), ResponseSpec { description })]),
        api_version: if route.version().is_unversioned() {
            None
        } else {
            Some(route.version().to_string())
        },
    }
}

/// Convert a `:name` path template into OpenAPI's `{name}` form.
fn openapi_path(path: &str) -> String {
    let converted: Vec<String> = path
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_string(),
        })
        .collect();
    let joined = converted.join("/");
    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}
