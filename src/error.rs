/*
 * Responsibility
 * - AppError (login / startup failures) and its IntoResponse
 * - the shared `{code, message, data}` response envelope
 * - last-resort 500 when the envelope itself cannot be produced
 */
use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

const JSON_UTF8: &str = "application/json; charset=UTF-8";

/// Response envelope used by every JSON error this service writes.
#[derive(Debug, Serialize)]
pub struct ResultBody<T: Serialize> {
    pub code: u16,
    pub message: String,
    pub data: T,
}

/// Serialize `body` as the response. Never fails: any problem degrades to a
/// plain-text 500.
pub fn json_response<T: Serialize>(status: StatusCode, body: &ResultBody<T>) -> Response {
    let bytes = match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize error body");
            return fallback_response();
        }
    };

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, JSON_UTF8)
        .body(Body::from(bytes))
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to build error response");
            fallback_response()
        })
}

pub fn fallback_response() -> Response {
    let mut res = Response::new(Body::from("internal server error"));
    *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=UTF-8"),
    );
    res
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("not found")]
    NotFound,

    #[error("request timed out")]
    Timeout,

    #[error("internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ResultBody {
            code: status.as_u16(),
            message: self.to_string(),
            data: serde_json::Value::Null,
        };

        json_response(status, &body)
    }
}
