//! The input validation capability
//!
//! The pipeline hands a validator the structured request input (path
//! params, query, headers, and parsed body) and expects back either a
//! coerced, typed output or a list of field-level issues. The pipeline does
//! not interpret validation semantics beyond success/failure; any engine can
//! implement [`Validator`]. The in-crate [`ObjectValidator`] covers the
//! common declarative case with string-to-scalar coercion for params, query,
//! and headers.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::error::ApiError;

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Dotted location of the failing field (`params.userId`, `body.email`).
    pub path: String,
    /// Human-readable message.
    pub message: String,
}

impl Issue {
    /// Create an issue.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// The raw, untyped request input handed to a validator.
#[derive(Debug, Clone, Default)]
pub struct RawInput {
    /// Path parameters extracted by the matcher.
    pub params: HashMap<String, String>,
    /// Decoded query pairs.
    pub query: HashMap<String, String>,
    /// Header names (lowercased) to values.
    pub headers: HashMap<String, String>,
    /// Parsed JSON body, absent for body-less requests.
    pub body: Option<Value>,
}

/// Coerced, validated request input as seen by the handler.
#[derive(Debug, Clone)]
pub struct ValidatedInput {
    params: Value,
    query: Value,
    headers: Value,
    body: Value,
}

impl ValidatedInput {
    /// Assemble from already-coerced sections.
    pub fn new(params: Value, query: Value, headers: Value, body: Value) -> Self {
        Self {
            params,
            query,
            headers,
            body,
        }
    }

    /// Wrap raw input unchanged, every scalar still a string.
    ///
    /// Used for routes registered without a validator.
    pub fn passthrough(raw: &RawInput) -> Self {
        Self {
            params: string_map(&raw.params),
            query: string_map(&raw.query),
            headers: string_map(&raw.headers),
            body: raw.body.clone().unwrap_or(Value::Null),
        }
    }

    /// The coerced path parameters object.
    pub fn params(&self) -> &Value {
        &self.params
    }

    /// The coerced query object.
    pub fn query(&self) -> &Value {
        &self.query
    }

    /// The coerced headers object.
    pub fn headers(&self) -> &Value {
        &self.headers
    }

    /// The validated body, `Value::Null` when absent.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Deserialize one path parameter.
    pub fn param<T: DeserializeOwned>(&self, name: &str) -> Result<T, ApiError> {
        section_field(&self.params, "params", name)
    }

    /// Deserialize one query parameter.
    pub fn query_param<T: DeserializeOwned>(&self, name: &str) -> Result<T, ApiError> {
        section_field(&self.query, "query", name)
    }

    /// Deserialize one header.
    pub fn header<T: DeserializeOwned>(&self, name: &str) -> Result<T, ApiError> {
        section_field(&self.headers, "headers", name)
    }

    /// Deserialize the whole body.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_value(self.body.clone())
            .map_err(|err| ApiError::handler(format!("body does not match expected shape: {err}")))
    }
}

fn string_map(map: &HashMap<String, String>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect(),
    )
}

fn section_field<T: DeserializeOwned>(
    section: &Value,
    section_name: &str,
    name: &str,
) -> Result<T, ApiError> {
    let value = section
        .get(name)
        .cloned()
        .ok_or_else(|| ApiError::handler(format!("missing {section_name}.{name}")))?;
    serde_json::from_value(value)
        .map_err(|err| ApiError::handler(format!("{section_name}.{name}: {err}")))
}

/// The validation capability consumed by the dispatch pipeline.
#[async_trait]
pub trait Validator: Send + Sync + 'static {
    /// Validate and coerce the raw input, or report every failing field.
    async fn validate(&self, input: &RawInput) -> Result<ValidatedInput, Vec<Issue>>;
}

/// Scalar types the declarative validator can coerce to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Any string; passed through.
    String,
    /// Coerced with `i64` parsing.
    Integer,
    /// Coerced with `f64` parsing.
    Number,
    /// Accepts `true`/`false`.
    Boolean,
}

impl FieldKind {
    fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
        }
    }

    fn coerce(&self, raw: &str) -> Option<Value> {
        match self {
            FieldKind::String => Some(Value::String(raw.to_string())),
            FieldKind::Integer => raw.parse::<i64>().ok().map(Value::from),
            FieldKind::Number => raw.parse::<f64>().ok().map(Value::from),
            FieldKind::Boolean => match raw {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
        }
    }

    fn matches_json(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FieldRule {
    kind: FieldKind,
    required: bool,
}

/// Declarative validator over the four input sections.
///
/// String sections (params, query, headers) are coerced scalar-by-scalar;
/// body fields are checked against the parsed JSON types. All issues are
/// collected before failing, so clients see every broken field at once.
///
/// ```ignore
/// let validator = ObjectValidator::new()
///     .param("userId", FieldKind::Integer)
///     .optional_query("page", FieldKind::Integer)
///     .body_field("email", FieldKind::String);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ObjectValidator {
    params: BTreeMap<String, FieldRule>,
    query: BTreeMap<String, FieldRule>,
    headers: BTreeMap<String, FieldRule>,
    body: BTreeMap<String, FieldRule>,
    require_body: bool,
}

impl ObjectValidator {
    /// An empty validator that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a path parameter of the given kind.
    pub fn param(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.params.insert(name.into(), FieldRule { kind, required: true });
        self
    }

    /// Require a query parameter of the given kind.
    pub fn query(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.query.insert(name.into(), FieldRule { kind, required: true });
        self
    }

    /// Accept an optional query parameter of the given kind.
    pub fn optional_query(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.query.insert(name.into(), FieldRule { kind, required: false });
        self
    }

    /// Require a header (lowercased name) of the given kind.
    pub fn header(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.headers
            .insert(name.into().to_lowercase(), FieldRule { kind, required: true });
        self
    }

    /// Accept an optional header of the given kind.
    pub fn optional_header(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.headers
            .insert(name.into().to_lowercase(), FieldRule { kind, required: false });
        self
    }

    /// Require a top-level body field of the given kind.
    ///
    /// Adding any body field makes a JSON object body mandatory.
    pub fn body_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.require_body = true;
        self.body.insert(name.into(), FieldRule { kind, required: true });
        self
    }

    /// Accept an optional top-level body field of the given kind.
    pub fn optional_body_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.require_body = true;
        self.body.insert(name.into(), FieldRule { kind, required: false });
        self
    }

    fn check_strings(
        rules: &BTreeMap<String, FieldRule>,
        section: &str,
        raw: &HashMap<String, String>,
        issues: &mut Vec<Issue>,
    ) -> Map<String, Value> {
        let mut out: Map<String, Value> = raw
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        for (name, rule) in rules {
            match raw.get(name) {
                Some(value) => match rule.kind.coerce(value) {
                    Some(coerced) => {
                        out.insert(name.clone(), coerced);
                    }
                    None => issues.push(Issue::new(
                        format!("{section}.{name}"),
                        format!("expected {}, got '{value}'", rule.kind.name()),
                    )),
                },
                None if rule.required => issues.push(Issue::new(
                    format!("{section}.{name}"),
                    format!("required {} is missing", rule.kind.name()),
                )),
                None => {}
            }
        }
        out
    }

    fn check_body(&self, raw: &RawInput, issues: &mut Vec<Issue>) -> Value {
        if self.body.is_empty() && !self.require_body {
            return raw.body.clone().unwrap_or(Value::Null);
        }
        let object = match &raw.body {
            Some(Value::Object(object)) => object,
            Some(_) => {
                issues.push(Issue::new("body", "expected a JSON object"));
                return Value::Null;
            }
            None => {
                issues.push(Issue::new("body", "request body is required"));
                return Value::Null;
            }
        };

        for (name, rule) in &self.body {
            match object.get(name) {
                Some(value) if rule.kind.matches_json(value) => {}
                Some(value) => issues.push(Issue::new(
                    format!("body.{name}"),
                    format!("expected {}, got {value}", rule.kind.name()),
                )),
                None if rule.required => issues.push(Issue::new(
                    format!("body.{name}"),
                    format!("required {} is missing", rule.kind.name()),
                )),
                None => {}
            }
        }
        Value::Object(object.clone())
    }
}

#[async_trait]
impl Validator for ObjectValidator {
    async fn validate(&self, input: &RawInput) -> Result<ValidatedInput, Vec<Issue>> {
        let mut issues = Vec::new();

        let params = Self::check_strings(&self.params, "params", &input.params, &mut issues);
        let query = Self::check_strings(&self.query, "query", &input.query, &mut issues);
        let headers = Self::check_strings(&self.headers, "headers", &input.headers, &mut issues);
        let body = self.check_body(input, &mut issues);

        if issues.is_empty() {
            Ok(ValidatedInput::new(
                Value::Object(params),
                Value::Object(query),
                Value::Object(headers),
                body,
            ))
        } else {
            Err(issues)
        }
    }
}
