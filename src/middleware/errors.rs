use std::sync::Arc;

use crate::web::{Handler, Middleware, Request, WebError, handler, respond_error};

/// Turns errors from the inner chain into responses.
///
/// A shutdown error is not swallowed: its status is recorded and it is
/// returned again, so the app can answer it and stop the server.
pub struct Errors;

impl Middleware for Errors {
    fn wrap(&self, next: Handler) -> Handler {
        handler(move |req: Request| {
            let next = Arc::clone(&next);
            async move {
                let values = Arc::clone(req.values());

                let err = match next(req).await {
                    Ok(response) => return Ok(response),
                    Err(err) => err,
                };

                match &err {
                    WebError::Request { status, message } => {
                        tracing::info!(
                            trace_id = %values.trace_id,
                            status = status.as_u16(),
                            message = %message,
                            "request error"
                        );
                    }
                    WebError::Internal(source) => {
                        tracing::error!(
                            trace_id = %values.trace_id,
                            error = ?source,
                            "internal error"
                        );
                    }
                    WebError::Shutdown(reason) => {
                        tracing::error!(
                            trace_id = %values.trace_id,
                            reason = %reason,
                            "fatal error"
                        );
                    }
                }

                if err.is_shutdown() {
                    values.set_status_code(err.status());
                    return Err(err);
                }

                Ok(respond_error(&values, &err))
            }
        })
    }
}
