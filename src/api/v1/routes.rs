/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health は whitelist、それ以外は gate を通った前提
 * - admin 配下の role 要件は app.rs で gate に登録する
 */
use axum::{Router, routing::get};

use crate::state::AppState;

use crate::api::v1::handlers::{admin::ping, health::health, me::me};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/me", get(me))
        .route("/admin/ping", get(ping))
}
