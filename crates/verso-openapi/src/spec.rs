//! OpenAPI 3.0 document types
//!
//! A deliberately small slice of the OpenAPI object model: enough to
//! describe the paths, parameters, request bodies, and responses the route
//! registry knows about.

use serde::Serialize;
use std::collections::BTreeMap;

/// Top-level OpenAPI document.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// OpenAPI version marker.
    pub openapi: &'static str,
    /// API metadata.
    pub info: Info,
    /// Path templates to their operations, sorted for stable output.
    pub paths: BTreeMap<String, PathItem>,
}

impl Document {
    /// An empty document.
    pub fn new(info: Info) -> Self {
        Self {
            openapi: "3.0.3",
            info,
            paths: BTreeMap::new(),
        }
    }

    /// Serialize to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}

/// The `info` object.
#[derive(Debug, Clone, Serialize)]
pub struct Info {
    /// API title.
    pub title: String,
    /// Document version string (the resolved API version).
    pub version: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Info {
    /// Info with a title; the version is filled in by the exporter.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: String::new(),
            description: None,
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Operations available on one path.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
}

/// One operation (endpoint revision) in the document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Operation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: BTreeMap<String, ResponseSpec>,
    /// The API version whose revision this operation describes.
    #[serde(rename = "x-api-version", skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

/// A path/query/header parameter.
#[derive(Debug, Clone, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: &'static str,
    pub required: bool,
    pub schema: SchemaRef,
}

/// A request body description.
#[derive(Debug, Clone, Serialize)]
pub struct RequestBody {
    pub required: bool,
    pub content: BTreeMap<String, MediaType>,
}

/// Media type entry inside a request body or response.
#[derive(Debug, Clone, Serialize)]
pub struct MediaType {
    pub schema: SchemaRef,
}

/// A response description.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResponseSpec {
    pub description: String,
}

/// An inline schema fragment.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct SchemaRef(pub serde_json::Value);

impl SchemaRef {
    /// `{"type": "string"}`
    pub fn string() -> Self {
        Self(serde_json::json!({ "type": "string" }))
    }

    /// `{"type": "object"}`
    pub fn object() -> Self {
        Self(serde_json::json!({ "type": "object" }))
    }
}
