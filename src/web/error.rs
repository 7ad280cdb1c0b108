use axum::http::StatusCode;
use thiserror::Error;

/// Every error a handler or middleware may return.
///
/// - `Request`: trusted, its status and message go to the client as-is.
/// - `Internal`: unexpected; the client only sees a generic 500.
/// - `Shutdown`: the service can no longer be trusted to run. It is answered
///   like an internal error, then escapes the chain so the server stops.
#[derive(Debug, Error)]
pub enum WebError {
    #[error("{message}")]
    Request { status: StatusCode, message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),

    #[error("shutdown requested: {0}")]
    Shutdown(String),
}

impl WebError {
    pub fn request(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Request {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::request(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::request(StatusCode::FORBIDDEN, message)
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }

    pub fn shutdown(reason: impl Into<String>) -> Self {
        Self::Shutdown(reason.into())
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown(_))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Request { status, .. } => *status,
            Self::Internal(_) | Self::Shutdown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code for the JSON error body.
    pub fn code(&self) -> &'static str {
        match self.status() {
            StatusCode::BAD_REQUEST => "BAD_REQUEST",
            StatusCode::UNAUTHORIZED => "UNAUTHORIZED",
            StatusCode::FORBIDDEN => "FORBIDDEN",
            StatusCode::NOT_FOUND => "NOT_FOUND",
            StatusCode::REQUEST_TIMEOUT => "REQUEST_TIMEOUT",
            StatusCode::CONFLICT => "CONFLICT",
            StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
            s if s.is_server_error() => "INTERNAL",
            _ => "REQUEST_ERROR",
        }
    }

    /// Message safe to show the client.
    pub fn public_message(&self) -> String {
        match self {
            Self::Request { message, .. } => message.clone(),
            Self::Internal(_) | Self::Shutdown(_) => "internal server error".to_string(),
        }
    }
}
