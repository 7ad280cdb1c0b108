use std::sync::Arc;

use metrics::{counter, histogram};

use crate::web::{Handler, Middleware, Request, handler};

/// Request counters and latency.
///
/// Sits inside `Errors`, so it sees raw errors before they are turned into
/// responses.
pub struct Metrics;

impl Middleware for Metrics {
    fn wrap(&self, next: Handler) -> Handler {
        handler(move |req: Request| {
            let next = Arc::clone(&next);
            async move {
                let values = Arc::clone(req.values());

                let result = next(req).await;

                counter!("http_requests_total").increment(1);
                if result.is_err() {
                    counter!("http_request_errors_total").increment(1);
                }
                histogram!("http_request_duration_seconds").record(values.elapsed().as_secs_f64());

                result
            }
        })
    }
}
