//! Request handling kernel layered over axum.
//!
//! Responsibility:
//! - `Handler` and `Middleware` abstractions, and chain composition
//! - Per-request values (trace id, timing, status) threaded through the chain
//! - Error classes and the JSON responders
//! - `App`: registers each route as one pre-built chain on an axum `Router`

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::response::Response;

mod app;
mod error;
mod middleware;
mod request;
mod respond;

pub use app::{App, ShutdownSender};
pub use error::WebError;
pub use middleware::{Middleware, wrap_middleware};
pub use request::{Request, Values};
pub use respond::{ErrorBody, ErrorResponse, respond, respond_error};

/// Header carrying the trace id in and out of the service.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type HandlerResult = Result<Response, WebError>;

/// A request handler: the business handler or a handler produced by a middleware.
pub type Handler = Arc<dyn Fn(Request) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Box an async function into a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |req| -> BoxFuture<'static, HandlerResult> { Box::pin(f(req)) })
}
