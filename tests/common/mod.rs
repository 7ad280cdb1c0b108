#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use http_body_util::BodyExt;
use jsonwebtoken::Algorithm;
use tokio::sync::mpsc;
use tower::ServiceExt;

use sales_api::app::build_router;
use sales_api::middleware::ForbiddenLogLevel;
use sales_api::middleware::http::TransportLimits;
use sales_api::services::auth::{
    Authenticator, Claims, KeyRegistry, PrivateKey, RegistryResolver,
};
use sales_api::state::AppState;

pub const KID: &str = "54bb2165-71e1-41a6-af3e-7da4a0e1e2c1";
pub const PRIVATE_PEM: &str = include_str!("../fixtures/rsa_primary.pem");
pub const PUBLIC_PEM: &str = include_str!("../fixtures/rsa_primary.pub.pem");
pub const OTHER_PRIVATE_PEM: &str = include_str!("../fixtures/rsa_secondary.pem");
pub const OTHER_PUBLIC_PEM: &str = include_str!("../fixtures/rsa_secondary.pub.pem");

/// Signing and verification over one registry, as wired when public keys
/// are derived at startup.
pub fn authenticator() -> Arc<Authenticator> {
    let keys = KeyRegistry::new();
    keys.add_key(
        KID,
        PrivateKey::from_pem_with_public(Algorithm::RS256, PRIVATE_PEM.as_bytes()).unwrap(),
    );
    let resolver = Arc::new(RegistryResolver::new(keys.clone()));

    Arc::new(Authenticator::new("RS256", resolver, keys).unwrap())
}

pub fn claims(roles: &[&str]) -> Claims {
    Claims::new(
        "service project",
        "5cf37266-3473-4006-984f-9325122678b7",
        "students",
        roles.iter().copied(),
        std::time::Duration::from_secs(3600),
    )
}

pub fn token(auth: &Authenticator, roles: &[&str]) -> String {
    auth.generate_token(KID, &claims(roles)).unwrap()
}

/// The production router around `auth`, plus the app's shutdown channel.
pub fn router(auth: Arc<Authenticator>) -> (Router, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(1);
    let state = AppState::new(auth, "test", ForbiddenLogLevel::Warn);
    (build_router(&state, tx, TransportLimits::default()), rx)
}

pub fn get(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

pub async fn send(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };

    TestResponse {
        status,
        headers,
        body,
    }
}
