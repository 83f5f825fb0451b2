use axum::Json;
use serde_json::{Value, json};

use crate::api::extractors::PrincipalExtractor;

// Only reachable with the `admin` role key (see `app::role_requirements`).
pub async fn ping(PrincipalExtractor(principal): PrincipalExtractor) -> Json<Value> {
    Json(json!({"status": "ok", "subject": principal.subject}))
}
