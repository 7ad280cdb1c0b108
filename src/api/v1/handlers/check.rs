/*
 * Responsibility
 * - GET /v1/liveness: is the process up (no auth)
 * - GET /v1/readiness: can it take traffic (admin only)
 */
use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;

use crate::web::{Handler, HandlerResult, Request, handler, respond};

#[derive(Debug, Serialize)]
struct Liveness {
    status: &'static str,
    build: String,
    host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pod: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pod_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    node: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
}

#[derive(Debug, Serialize)]
struct Readiness {
    status: &'static str,
    build: String,
}

pub fn liveness(build: &str) -> Handler {
    let build: Arc<str> = Arc::from(build);
    handler(move |req: Request| {
        let build = Arc::clone(&build);
        async move {
            let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
            let body = Liveness {
                status: "up",
                build: build.to_string(),
                host: env("HOSTNAME").unwrap_or_else(|| "unavailable".to_string()),
                pod: env("KUBERNETES_PODNAME"),
                pod_ip: env("KUBERNETES_NAMESPACE_POD_IP"),
                node: env("KUBERNETES_NODENAME"),
                namespace: env("KUBERNETES_NAMESPACE"),
            };

            let result: HandlerResult = Ok(respond(req.values(), StatusCode::OK, &body));
            result
        }
    })
}

pub fn readiness(build: &str) -> Handler {
    let build: Arc<str> = Arc::from(build);
    handler(move |req: Request| {
        let build = Arc::clone(&build);
        async move {
            let body = Readiness {
                status: "ok",
                build: build.to_string(),
            };

            let result: HandlerResult = Ok(respond(req.values(), StatusCode::OK, &body));
            result
        }
    })
}
