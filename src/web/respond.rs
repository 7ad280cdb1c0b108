use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::error::WebError;
use super::request::Values;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// Serialize `body` as JSON and record `status` on the request values.
pub fn respond<T: Serialize>(values: &Values, status: StatusCode, body: &T) -> Response {
    values.set_status_code(status);

    if status == StatusCode::NO_CONTENT {
        return status.into_response();
    }

    (status, Json(body)).into_response()
}

/// Render `err` for the client.
///
/// A shutdown response also tells the client the connection is closing.
pub fn respond_error(values: &Values, err: &WebError) -> Response {
    let body = ErrorResponse {
        error: ErrorBody {
            code: err.code(),
            message: err.public_message(),
        },
    };

    let mut response = respond(values, err.status(), &body);

    if err.is_shutdown() {
        response
            .headers_mut()
            .insert(header::CONNECTION, HeaderValue::from_static("close"));
    }

    response
}
