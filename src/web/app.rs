use std::sync::Arc;

use axum::Router;
use axum::response::Response;
use axum::routing::{MethodFilter, on};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::middleware::{Middleware, wrap_middleware};
use super::request::{Request, Values};
use super::respond::respond_error;
use super::{Handler, REQUEST_ID_HEADER, WebError};

/// Receives the reason whenever a handler reports a shutdown error.
pub type ShutdownSender = mpsc::Sender<String>;

/// Entry point to the application: owns the routing table and the app-wide
/// middleware every route is wrapped with.
pub struct App {
    router: Router,
    mw: Vec<Arc<dyn Middleware>>,
    shutdown: ShutdownSender,
}

impl App {
    pub fn new(shutdown: ShutdownSender, mw: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            router: Router::new(),
            mw,
            shutdown,
        }
    }

    /// Register `handler` for `method` and `path`.
    ///
    /// Route middleware sits inside the app middleware. The chain is built
    /// here, once, and shared by every request to the route.
    pub fn handle(
        mut self,
        method: MethodFilter,
        path: &str,
        handler: Handler,
        route_mw: Vec<Arc<dyn Middleware>>,
    ) -> Self {
        let chain = wrap_middleware(&route_mw, handler);
        let chain = wrap_middleware(&self.mw, chain);
        let shutdown = self.shutdown.clone();

        let endpoint = move |req: axum::extract::Request| {
            let chain = Arc::clone(&chain);
            let shutdown = shutdown.clone();
            async move { dispatch(chain, shutdown, req).await }
        };

        self.router = self.router.route(path, on(method, endpoint));
        self
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

async fn dispatch(chain: Handler, shutdown: ShutdownSender, req: axum::extract::Request) -> Response {
    let trace_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let values = Arc::new(Values::new(trace_id));

    match chain(Request::new(req, Arc::clone(&values))).await {
        Ok(response) => response,
        Err(err) => {
            if let WebError::Shutdown(reason) = &err {
                tracing::error!(
                    trace_id = %values.trace_id,
                    reason = %reason,
                    "shutdown requested"
                );
                if shutdown.try_send(reason.clone()).is_err() {
                    tracing::warn!(trace_id = %values.trace_id, "shutdown already pending");
                }
            } else {
                tracing::error!(
                    trace_id = %values.trace_id,
                    error = %err,
                    "error escaped the middleware chain"
                );
            }
            respond_error(&values, &err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::{HandlerResult, handler, respond};
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn echo_trace_id() -> Handler {
        handler(|req: Request| async move {
            let values = Arc::clone(req.values());
            let body = serde_json::json!({ "trace_id": values.trace_id });
            HandlerResult::Ok(respond(&values, StatusCode::OK, &body))
        })
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn trace_id_comes_from_request_id_header() {
        let (tx, _rx) = mpsc::channel(1);
        let router = App::new(tx, vec![])
            .handle(MethodFilter::GET, "/trace", echo_trace_id(), vec![])
            .into_router();

        let response = router
            .oneshot(
                axum::extract::Request::builder()
                    .uri("/trace")
                    .header(REQUEST_ID_HEADER, "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(body_json(response).await["trace_id"], "abc-123");
    }

    #[tokio::test]
    async fn trace_id_is_generated_when_absent() {
        let (tx, _rx) = mpsc::channel(1);
        let router = App::new(tx, vec![])
            .handle(MethodFilter::GET, "/trace", echo_trace_id(), vec![])
            .into_router();

        let response = router
            .oneshot(
                axum::extract::Request::builder()
                    .uri("/trace")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = body_json(response).await;
        let trace_id = body["trace_id"].as_str().unwrap();
        assert!(Uuid::parse_str(trace_id).is_ok());
    }

    #[tokio::test]
    async fn escaped_shutdown_error_signals_the_server() {
        let (tx, mut rx) = mpsc::channel(1);
        let failing = handler(|_req| async {
            let result: HandlerResult = Err(WebError::shutdown("state corrupted"));
            result
        });
        let router = App::new(tx, vec![])
            .handle(MethodFilter::GET, "/boom", failing, vec![])
            .into_router();

        let response = router
            .oneshot(
                axum::extract::Request::builder()
                    .uri("/boom")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[header::CONNECTION], "close");
        assert_eq!(rx.try_recv().unwrap(), "state corrupted");
    }

    #[tokio::test]
    async fn methods_share_a_path() {
        let (tx, _rx) = mpsc::channel(1);
        let post = handler(|req: Request| async move {
            HandlerResult::Ok(respond(req.values(), StatusCode::CREATED, &serde_json::json!({})))
        });
        let router = App::new(tx, vec![])
            .handle(MethodFilter::GET, "/items", echo_trace_id(), vec![])
            .handle(MethodFilter::POST, "/items", post, vec![])
            .into_router();

        let response = router
            .oneshot(
                axum::extract::Request::builder()
                    .method("POST")
                    .uri("/items")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
