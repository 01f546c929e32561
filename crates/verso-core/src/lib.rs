//! # verso-core
//!
//! Version-aware REST routing: register many revisions of an endpoint under
//! one (method, path), and let the resolution engine pick the revision that
//! serves each client's requested version.
//!
//! The pieces:
//!
//! - [`VersionHistory`]: the ordered list of every released version.
//! - [`Router`]: composable registration surface; [`Router::branch`] scopes
//!   a subtree to a path prefix with its own middleware.
//! - [`resolve`]: the resolution engine (exact/lexicographic and
//!   nearest-lower-date modes).
//! - [`App`]: the frozen dispatch core produced by [`Router::finish`],
//!   servable over hyper with [`App::run`] or in-process via
//!   [`testing::TestClient`].
//!
//! ```ignore
//! let history = VersionHistory::dated(["2024-01-01", "2024-02-01"])?;
//! let router = Router::new(history, VersionExtractor::date_header("x-api-version"));
//!
//! router
//!     .get("/users/:userId")
//!     .version("2024-01-01")
//!     .validator(ObjectValidator::new().param("userId", FieldKind::Integer))
//!     .handle(get_user_v1)?;
//! router
//!     .get("/users/:userId")
//!     .version("2024-02-01")
//!     .validator(ObjectValidator::new().param("userId", FieldKind::Integer))
//!     .handle(get_user_v2)?;
//!
//! router.finish().run("127.0.0.1:8080").await?;
//! ```

mod bundle;
mod error;
mod extract;
mod handler;
mod middleware;
mod pipeline;
mod registry;
mod request;
mod response;
pub mod resolve;
mod route;
mod router;
mod server;
pub mod testing;
pub mod validate;
mod version;

pub use bundle::{BundleEntry, RouteBundle};
pub use error::{ApiError, ErrorKind, ErrorPolicy, Result};
pub use extract::{ExtractFn, ParseDateFn, VersionExtractor};
pub use handler::{BoxFuture, BoxedHandler, Handler};
pub use middleware::{Middleware, MiddlewareChain, Next};
pub use registry::{RegistryError, RouteKey, RouteRegistry};
pub use request::{Request, VersionContext};
pub use response::{Created, IntoResponse, Json, NoContent, Response};
pub use route::{Method, RouteDefinition, RouteMeta};
pub use router::{App, Endpoint, Router};
pub use validate::{FieldKind, Issue, ObjectValidator, RawInput, ValidatedInput, Validator};
pub use version::{HistoryError, Version, VersionHistory};
