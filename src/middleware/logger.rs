use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;

use crate::web::{Handler, Middleware, Request, handler};

/// Logs the start and the outcome of every request.
pub struct Logger;

impl Middleware for Logger {
    fn wrap(&self, next: Handler) -> Handler {
        handler(move |req: Request| {
            let next = Arc::clone(&next);
            async move {
                let values = Arc::clone(req.values());
                let method = req.method().clone();
                let path = req.uri().path().to_string();

                tracing::info!(
                    trace_id = %values.trace_id,
                    method = %method,
                    path = %path,
                    "request started"
                );

                let result = next(req).await;

                let status = values
                    .status_code()
                    .or_else(|| result.as_ref().ok().map(|r| r.status()))
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let latency_ms = millis(values.elapsed());

                if status.is_server_error() {
                    tracing::error!(
                        trace_id = %values.trace_id,
                        method = %method,
                        path = %path,
                        status = status.as_u16(),
                        latency_ms,
                        "request completed"
                    );
                } else if status.is_client_error() {
                    tracing::warn!(
                        trace_id = %values.trace_id,
                        method = %method,
                        path = %path,
                        status = status.as_u16(),
                        latency_ms,
                        "request completed"
                    );
                } else {
                    tracing::info!(
                        trace_id = %values.trace_id,
                        method = %method,
                        path = %path,
                        status = status.as_u16(),
                        latency_ms,
                        "request completed"
                    );
                }

                result
            }
        })
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
