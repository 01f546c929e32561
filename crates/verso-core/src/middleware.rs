//! Middleware chain
//!
//! Classic chain-of-responsibility: each middleware receives the request and
//! a [`Next`] continuation. Invoking the continuation runs the rest of the
//! chain (ending in validation and the handler); returning a response
//! without invoking it short-circuits the request. Execution is strictly
//! sequential in registration order.

use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;
use std::sync::Arc;

/// The continuation a middleware must call to keep the request moving.
pub type Next = Arc<dyn Fn(Request) -> BoxFuture<Response> + Send + Sync>;

/// A single middleware.
pub trait Middleware: Send + Sync + 'static {
    /// Process the request, calling `next` to continue the chain.
    fn call(&self, req: Request, next: Next) -> BoxFuture<Response>;
}

impl<F> Middleware for F
where
    F: Fn(Request, Next) -> BoxFuture<Response> + Send + Sync + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture<Response> {
        self(req, next)
    }
}

/// An ordered middleware chain captured for one route revision.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_layers(layers: Vec<Arc<dyn Middleware>>) -> Self {
        Self { layers }
    }

    /// Append a middleware; it runs after everything already in the chain.
    pub fn push(&mut self, layer: Arc<dyn Middleware>) {
        self.layers.push(layer);
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether the chain has no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Run the chain, with `terminal` as the innermost stage.
    ///
    /// Built inside-out so the first registered layer is the outermost: it
    /// sees the request first and the response last.
    pub fn execute(&self, req: Request, terminal: Next) -> BoxFuture<Response> {
        let mut next = terminal;
        for layer in self.layers.iter().rev() {
            let layer = layer.clone();
            let inner = next;
            next = Arc::new(move |req: Request| layer.call(req, inner.clone()));
        }
        next(req)
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("layers", &self.layers.len())
            .finish()
    }
}
