//! Turns a gate rejection into the HTTP response the client sees.
//!
//! - unauthenticated (no / bad token): 401
//! - unauthorized (authenticated, but not allowed): 403
//!
//! Both write `{code, message, data}` where `data` is the rejection detail.

use axum::http::StatusCode;
use axum::response::Response;

use crate::error::{ResultBody, json_response};
use crate::services::auth::error::{AuthError, FailureKind};

pub const UNAUTHENTICATED_MESSAGE: &str = "authentication required";
pub const UNAUTHORIZED_MESSAGE: &str = "insufficient privilege";

#[derive(Debug, Clone, Copy, Default)]
pub struct FailureResponder;

impl FailureResponder {
    pub fn respond(&self, err: &AuthError) -> Response {
        match err.kind() {
            FailureKind::Unauthenticated => self.unauthenticated(err),
            FailureKind::Unauthorized => self.unauthorized(err),
        }
    }

    pub fn unauthenticated(&self, err: &AuthError) -> Response {
        render(StatusCode::UNAUTHORIZED, UNAUTHENTICATED_MESSAGE, err)
    }

    pub fn unauthorized(&self, err: &AuthError) -> Response {
        render(StatusCode::FORBIDDEN, UNAUTHORIZED_MESSAGE, err)
    }
}

fn render(status: StatusCode, message: &str, err: &AuthError) -> Response {
    let body = ResultBody {
        code: status.as_u16(),
        message: message.to_string(),
        data: err.to_string(),
    };
    json_response(status, &body)
}
