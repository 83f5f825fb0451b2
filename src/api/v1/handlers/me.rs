use axum::Json;

use crate::api::extractors::PrincipalExtractor;
use crate::services::auth::Principal;

/// The caller's identity as resolved by the gate.
pub async fn me(PrincipalExtractor(principal): PrincipalExtractor) -> Json<Principal> {
    Json(principal)
}
