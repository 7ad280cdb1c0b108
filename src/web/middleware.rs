use std::sync::Arc;

use super::Handler;

/// Produces a new handler around `next`.
///
/// Middleware may run code before or after `next`, or answer without calling
/// it at all.
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: Handler) -> Handler;
}

impl<F> Middleware for F
where
    F: Fn(Handler) -> Handler + Send + Sync,
{
    fn wrap(&self, next: Handler) -> Handler {
        self(next)
    }
}

/// Wrap `handler` in `mw`, first element outermost.
///
/// The last middleware in the list ends up closest to the handler.
pub fn wrap_middleware(mw: &[Arc<dyn Middleware>], handler: Handler) -> Handler {
    mw.iter().rev().fold(handler, |next, m| m.wrap(next))
}
