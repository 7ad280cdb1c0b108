use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use chrono::{DateTime, Utc};

use crate::services::auth::Claims;

/// Values owned by the chain for the lifetime of one request.
///
/// Shared by `Arc` so that outer middleware can still read them once the
/// request itself has been moved into `next`.
#[derive(Debug)]
pub struct Values {
    pub trace_id: String,
    pub now: DateTime<Utc>,
    started: Instant,
    // 0 until something responds
    status_code: AtomicU16,
}

impl Values {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            now: Utc::now(),
            started: Instant::now(),
            status_code: AtomicU16::new(0),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        match self.status_code.load(Ordering::Relaxed) {
            0 => None,
            code => StatusCode::from_u16(code).ok(),
        }
    }

    pub fn set_status_code(&self, status: StatusCode) {
        self.status_code.store(status.as_u16(), Ordering::Relaxed);
    }
}

/// The request as seen by middleware and handlers.
///
/// Claims are only present once an authenticating middleware has run.
#[derive(Debug)]
pub struct Request {
    http: axum::extract::Request,
    values: Arc<Values>,
    claims: Option<Claims>,
}

impl Request {
    pub fn new(http: axum::extract::Request, values: Arc<Values>) -> Self {
        Self {
            http,
            values,
            claims: None,
        }
    }

    pub fn values(&self) -> &Arc<Values> {
        &self.values
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    pub fn set_claims(&mut self, claims: Claims) {
        self.claims = Some(claims);
    }

    pub fn method(&self) -> &Method {
        self.http.method()
    }

    pub fn uri(&self) -> &Uri {
        self.http.uri()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.http.headers()
    }

    pub fn into_body(self) -> Body {
        self.http.into_body()
    }
}
