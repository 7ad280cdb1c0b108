mod common;

use axum::http::{StatusCode, header};
use jsonwebtoken::{Algorithm, EncodingKey, Header};

use common::{KID, get, router, send, token};
use sales_api::services::auth::{ROLE_ADMIN, ROLE_USER};

#[tokio::test]
async fn liveness_needs_no_token() {
    let (router, _rx) = router(common::authenticator());

    let res = send(router, get("/v1/liveness", None)).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "up");
    assert_eq!(res.body["build"], "test");
    assert!(res.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn admin_token_passes_readiness() {
    let auth = common::authenticator();
    let token = token(&auth, &[ROLE_ADMIN]);
    let (router, _rx) = router(auth);

    let res = send(
        router,
        get("/v1/readiness", Some(&format!("Bearer {token}"))),
    )
    .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "ok");
    assert_eq!(res.body["build"], "test");
}

#[tokio::test]
async fn scheme_is_case_insensitive() {
    let auth = common::authenticator();
    let token = token(&auth, &[ROLE_ADMIN, ROLE_USER]);
    let (router, _rx) = router(auth);

    let res = send(
        router,
        get("/v1/readiness", Some(&format!("bEaReR {token}"))),
    )
    .await;

    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn user_token_is_forbidden_on_readiness() {
    let auth = common::authenticator();
    let token = token(&auth, &[ROLE_USER]);
    let (router, _rx) = router(auth);

    let res = send(
        router,
        get("/v1/readiness", Some(&format!("Bearer {token}"))),
    )
    .await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"]["code"], "FORBIDDEN");
    assert_eq!(
        res.body["error"]["message"],
        "you are not authorized for that action"
    );
}

#[tokio::test]
async fn token_without_roles_is_forbidden() {
    let auth = common::authenticator();
    let token = token(&auth, &[]);
    let (router, _rx) = router(auth);

    let res = send(
        router,
        get("/v1/readiness", Some(&format!("Bearer {token}"))),
    )
    .await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn basic_scheme_is_unauthorized() {
    let (router, _rx) = router(common::authenticator());

    let res = send(router, get("/v1/readiness", Some("Basic abc"))).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(
        res.body["error"]["message"],
        "expected authorization header format: bearer <token>"
    );
}

#[tokio::test]
async fn missing_header_is_unauthorized() {
    let (router, _rx) = router(common::authenticator());

    let res = send(router, get("/v1/readiness", None)).await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(
        res.body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("bearer")
    );
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let auth = common::authenticator();
    let mut claims = common::claims(&[ROLE_ADMIN]);
    claims.issued_at = claims.issued_at - chrono::Duration::days(2);
    claims.expires_at = claims.issued_at + chrono::Duration::days(1);
    let token = auth.generate_token(KID, &claims).unwrap();
    let (router, _rx) = router(auth);

    let res = send(
        router,
        get("/v1/readiness", Some(&format!("Bearer {token}"))),
    )
    .await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"]["message"], "token has expired");
}

#[tokio::test]
async fn unknown_kid_is_unauthorized() {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some("not-a-registered-kid".to_string());
    let token = jsonwebtoken::encode(
        &header,
        &common::claims(&[ROLE_ADMIN]),
        &EncodingKey::from_rsa_pem(common::OTHER_PRIVATE_PEM.as_bytes()).unwrap(),
    )
    .unwrap();
    let (router, _rx) = router(common::authenticator());

    let res = send(
        router,
        get("/v1/readiness", Some(&format!("Bearer {token}"))),
    )
    .await;

    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    // the cause stays in the server log
    assert_eq!(res.body["error"]["message"], "invalid token");
    assert!(!res.body.to_string().contains("not-a-registered-kid"));
}

#[tokio::test]
async fn removing_a_key_revokes_its_tokens() {
    let auth = common::authenticator();
    let token = token(&auth, &[ROLE_ADMIN]);
    let (router, _rx) = router(auth.clone());

    let res = send(
        router.clone(),
        get("/v1/readiness", Some(&format!("Bearer {token}"))),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);

    auth.remove_key(KID);
    assert!(auth.generate_token(KID, &common::claims(&[ROLE_ADMIN])).is_err());

    let res = send(
        router,
        get("/v1/readiness", Some(&format!("Bearer {token}"))),
    )
    .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn request_id_becomes_the_trace_id() {
    let (router, _rx) = router(common::authenticator());
    let mut request = get("/v1/liveness", None);
    request
        .headers_mut()
        .insert("x-request-id", "3f2b8c1e".parse().unwrap());

    let res = send(router, request).await;

    assert_eq!(res.headers["x-request-id"], "3f2b8c1e");
    assert!(res.headers.get(header::CONNECTION).is_none());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (router, _rx) = router(common::authenticator());

    let res = send(router, get("/v1/nope", None)).await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
}
