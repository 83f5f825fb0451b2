use axum::{Router, routing::post};

use crate::api::auth::handlers::{login, logout};
use crate::state::AppState;

pub fn routes(login_path: &str, logout_path: &str) -> Router<AppState> {
    Router::new()
        .route(login_path, post(login))
        .route(logout_path, post(logout))
}
