use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::{error, info, warn};

use crate::api::auth::dto::{LoginRequest, LoginResponse};
use crate::api::extractors::PrincipalExtractor;
use crate::error::AppError;
use crate::state::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidRequest(
            "username and password are required".to_string(),
        ));
    }

    let account = state
        .credentials
        .verify(&req.username, &req.password)
        .await
        .map_err(|e| {
            error!(error = %e, "credential check failed");
            AppError::Internal
        })?
        .ok_or_else(|| {
            warn!(username = %req.username, "login rejected");
            AppError::InvalidCredentials
        })?;

    let access_token = state
        .gate
        .codec()
        .issue(&account.subject, &account.role_key, state.token_ttl)?;

    info!(subject = %account.subject, role = %account.role_key, "token issued");

    Ok(Json(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.token_ttl.as_secs(),
    }))
}

/// Nothing to invalidate server-side; the client drops its token.
pub async fn logout(PrincipalExtractor(principal): PrincipalExtractor) -> StatusCode {
    info!(subject = %principal.subject, "logout");
    StatusCode::NO_CONTENT
}
