use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use metrics::counter;

use crate::web::{Handler, Middleware, Request, WebError, handler};

/// Converts a panic anywhere below into an internal error.
pub struct Panics;

impl Middleware for Panics {
    fn wrap(&self, next: Handler) -> Handler {
        handler(move |req: Request| {
            let next = Arc::clone(&next);
            async move {
                let values = Arc::clone(req.values());

                // Calling `next` may itself panic before any future exists.
                let outcome = match panic::catch_unwind(AssertUnwindSafe(|| next(req))) {
                    Ok(fut) => CatchUnwind { inner: fut }.await,
                    Err(payload) => Err(payload),
                };

                outcome.unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    counter!("http_panics_total").increment(1);
                    tracing::error!(
                        trace_id = %values.trace_id,
                        panic = %message,
                        "handler panicked"
                    );
                    Err(WebError::internal(anyhow::anyhow!("PANIC [{message}]")))
                })
            }
        })
    }
}

/// Polls `inner`, reporting a panic during any poll as `Err`.
struct CatchUnwind<F> {
    inner: F,
}

impl<F: Future + Unpin> Future for CatchUnwind<F> {
    type Output = Result<F::Output, Box<dyn Any + Send>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let inner = &mut self.inner;
        match panic::catch_unwind(AssertUnwindSafe(|| Pin::new(inner).poll(cx))) {
            Ok(Poll::Pending) => Poll::Pending,
            Ok(Poll::Ready(output)) => Poll::Ready(Ok(output)),
            Err(payload) => Poll::Ready(Err(payload)),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
