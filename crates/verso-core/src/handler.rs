//! Handler abstraction
//!
//! A handler receives the request (with its resolved-version context) and
//! the validated input, and produces a response or an [`ApiError`]. Plain
//! `async fn`s with that signature implement the trait through the blanket
//! impl.

use crate::error::ApiError;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::validate::ValidatedInput;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future used across the dispatch pipeline.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// An async request handler.
pub trait Handler: Send + Sync + 'static {
    /// Handle the request.
    fn call(&self, req: Request, input: ValidatedInput) -> BoxFuture<Result<Response, ApiError>>;
}

/// Shared handler reference stored in route bundles.
pub type BoxedHandler = Arc<dyn Handler>;

impl<F, Fut, R> Handler for F
where
    F: Fn(Request, ValidatedInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ApiError>> + Send + 'static,
    R: IntoResponse + 'static,
{
    fn call(&self, req: Request, input: ValidatedInput) -> BoxFuture<Result<Response, ApiError>> {
        let fut = self(req, input);
        Box::pin(async move { fut.await.map(IntoResponse::into_response) })
    }
}
