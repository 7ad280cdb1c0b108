//! Bearer authentication and role authorization.
//!
//! `Authenticate` verifies the `Authorization: Bearer <token>` header and puts
//! the claims on the request. `Authorize` must run after it; it checks those
//! claims against the roles a route requires.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::http::header;

use crate::services::auth::{AuthError, Authenticator, Claims};
use crate::web::{Handler, Middleware, Request, WebError, handler};

const BEARER_FORMAT: &str = "expected authorization header format: bearer <token>";
const NOT_AUTHORIZED: &str = "you are not authorized for that action";
const INVALID_TOKEN: &str = "invalid token";
const TOKEN_EXPIRED: &str = "token has expired";

/// Where a request ends up after inspecting its `Authorization` header.
#[derive(Debug)]
pub enum AuthState {
    NoHeader,
    MalformedHeader,
    InvalidToken(AuthError),
    Authenticated(Claims),
}

impl AuthState {
    fn into_result(self) -> Result<Claims, WebError> {
        match self {
            Self::Authenticated(claims) => Ok(claims),
            Self::NoHeader | Self::MalformedHeader => Err(WebError::unauthorized(BEARER_FORMAT)),
            Self::InvalidToken(AuthError::ExpiredToken) => {
                Err(WebError::unauthorized(TOKEN_EXPIRED))
            }
            Self::InvalidToken(_) => Err(WebError::unauthorized(INVALID_TOKEN)),
        }
    }
}

/// Extract the token from `Bearer <token>`.
///
/// Exactly two parts separated by a single space; the scheme is matched
/// case-insensitively.
pub fn bearer_token(value: &str) -> Option<&str> {
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() =>
        {
            Some(token)
        }
        _ => None,
    }
}

/// Run the header through the authenticator.
pub async fn authenticate(auth: &Authenticator, header: Option<&str>) -> AuthState {
    let Some(value) = header else {
        return AuthState::NoHeader;
    };
    let Some(token) = bearer_token(value) else {
        return AuthState::MalformedHeader;
    };

    match auth.validate_token(token).await {
        Ok(claims) => AuthState::Authenticated(claims),
        Err(err) => AuthState::InvalidToken(err),
    }
}

pub struct Authenticate {
    auth: Arc<Authenticator>,
}

impl Authenticate {
    pub fn new(auth: Arc<Authenticator>) -> Self {
        Self { auth }
    }
}

impl Middleware for Authenticate {
    fn wrap(&self, next: Handler) -> Handler {
        let auth = Arc::clone(&self.auth);
        handler(move |mut req: Request| {
            let next = Arc::clone(&next);
            let auth = Arc::clone(&auth);
            async move {
                // A non-UTF-8 header can't be a bearer token.
                let header = req
                    .headers()
                    .get(header::AUTHORIZATION)
                    .map(|v| v.to_str().unwrap_or_default());

                let state = authenticate(&auth, header).await;
                if let AuthState::InvalidToken(err) = &state {
                    tracing::warn!(
                        trace_id = %req.values().trace_id,
                        kind = err.kind(),
                        error = ?err,
                        "token rejected"
                    );
                }

                match state.into_result() {
                    Ok(claims) => {
                        req.set_claims(claims);
                        next(req).await
                    }
                    Err(err) => Err(err),
                }
            }
        })
    }
}

/// Severity used when a request is refused for lack of a role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ForbiddenLogLevel {
    #[default]
    Warn,
    Error,
}

impl FromStr for ForbiddenLogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

impl fmt::Display for ForbiddenLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warn => f.write_str("warn"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// Lets the request through only if its claims carry one of `roles`.
pub struct Authorize {
    roles: Arc<[String]>,
    log_level: ForbiddenLogLevel,
}

impl Authorize {
    pub fn new<I, R>(roles: I, log_level: ForbiddenLogLevel) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            log_level,
        }
    }
}

impl Middleware for Authorize {
    fn wrap(&self, next: Handler) -> Handler {
        let roles = Arc::clone(&self.roles);
        let log_level = self.log_level;
        handler(move |req: Request| {
            let next = Arc::clone(&next);
            let roles = Arc::clone(&roles);
            async move {
                let Some(claims) = req.claims() else {
                    return Err(WebError::internal(anyhow::anyhow!(
                        "authorize: claims missing from request, authenticate must run first"
                    )));
                };

                if !claims.authorize(&roles[..]) {
                    let trace_id = &req.values().trace_id;
                    match log_level {
                        ForbiddenLogLevel::Warn => tracing::warn!(
                            trace_id = %trace_id,
                            subject = %claims.subject,
                            roles = ?claims.roles,
                            required = ?roles,
                            "forbidden"
                        ),
                        ForbiddenLogLevel::Error => tracing::error!(
                            trace_id = %trace_id,
                            subject = %claims.subject,
                            roles = ?claims.roles,
                            required = ?roles,
                            "forbidden"
                        ),
                    }
                    return Err(WebError::forbidden(NOT_AUTHORIZED));
                }

                next(req).await
            }
        })
    }
}
