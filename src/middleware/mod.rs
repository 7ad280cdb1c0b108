//! Middleware for the handler chain, plus the tower transport layers.
//!
//! App-wide order, outermost first: logger, errors, metrics, panics.
//! Route-level `Authenticate` and `Authorize` sit inside those, closest to
//! the handler.

use std::sync::Arc;

use crate::web::Middleware;

pub mod auth;
pub mod errors;
pub mod http;
pub mod logger;
pub mod metrics;
pub mod panics;

pub use auth::{Authenticate, Authorize, ForbiddenLogLevel};
pub use errors::Errors;
pub use logger::Logger;
pub use self::metrics::Metrics;
pub use panics::Panics;

/// The middleware every route is wrapped in.
pub fn app_middleware() -> Vec<Arc<dyn Middleware>> {
    vec![
        Arc::new(Logger),
        Arc::new(Errors),
        Arc::new(Metrics),
        Arc::new(Panics),
    ]
}
