//! # verso-openapi
//!
//! OpenAPI 3.0 document generation for verso APIs. A read-only consumer of
//! the route registry: for every (method, path) it resolves the one revision
//! a client pinned to the document's version would actually reach, then
//! describes that revision's parameters, request body, and responses.

mod export;
mod spec;

pub use export::{document, documents_per_version};
pub use spec::{
    Document, Info, MediaType, Operation, Parameter, PathItem, RequestBody, ResponseSpec,
    SchemaRef,
};
