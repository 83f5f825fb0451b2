/*
 * Responsibility
 * - Config読み込み → 依存生成 (gate / credentials) → Router 組み立て
 * - Middleware の適用順: auth gate → CORS → HTTP 共通 (request-id / trace / limit / timeout)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::{Config, MIN_SECRET_LENGTH};
use crate::error::AppError;
use crate::middleware;
use crate::services::auth::build_gate;
use crate::services::auth::clock::{Clock, SystemClock};
use crate::services::auth::credentials::StaticCredentials;
use crate::services::auth::policy::RoleRequirement;
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,auth_gate=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // Development: fail fast. Production: default hook, keep serving.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting auth gate in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config, Arc::new(SystemClock))?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Paths that need more than a valid token.
pub fn role_requirements() -> Result<Vec<RoleRequirement>, AppError> {
    let admin = RoleRequirement::new("/api/v1/admin/**", ["admin"]).map_err(|e| {
        tracing::error!(error = %e, "invalid role requirement");
        AppError::Internal
    })?;
    Ok(vec![admin])
}

pub fn build_state(config: &Config, clock: Arc<dyn Clock>) -> Result<AppState, AppError> {
    if config.security.secret.len() < MIN_SECRET_LENGTH {
        tracing::warn!(
            len = config.security.secret.len(),
            min = MIN_SECRET_LENGTH,
            "AUTH_SECRET is shorter than recommended"
        );
    }

    let gate = build_gate(&config.security, clock, role_requirements()?)?;

    let credentials = StaticCredentials::new(config.accounts.clone());
    if credentials.is_empty() {
        tracing::warn!("AUTH_USERS is empty; login will reject every request");
    }

    Ok(AppState::new(
        gate,
        Arc::new(credentials),
        config.security.token_ttl,
    ))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .merge(api::auth::routes(
            &config.security.login_path,
            &config.security.logout_path,
        ))
        .nest("/api/v1", api::v1::routes())
        .fallback(|| async { AppError::NotFound });

    // Gate goes on last so the fallback is covered as well.
    let router = middleware::auth::access::apply(router, state.clone()).with_state(state);

    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router, config)
}
