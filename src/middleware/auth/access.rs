//! Runs the `AuthorizationGate` in front of every route.
//!
//! - WHITELISTED: pass through, no principal
//! - AUTHORIZED: `Principal` goes into request extensions, then pass through
//! - anything else: the inner service is never called; the gate's
//!   `FailureResponder` writes the 401/403 body

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::services::auth::GateDecision;
use crate::state::AppState;

/// Put the gate in front of `router`.
///
/// Apply after all routes and the fallback are registered, so unknown paths
/// are gated too.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let decision = state
        .gate
        .evaluate(req.method(), req.uri().path(), req.headers());

    match decision {
        GateDecision::Whitelisted => {
            tracing::debug!(path = %req.uri().path(), "whitelisted path, skipping auth");
            next.run(req).await
        }
        GateDecision::Authorized(principal) => {
            tracing::debug!(subject = %principal.subject, "request authorized");
            // middleware → extractor への受け渡し
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        GateDecision::Rejected(err) => {
            tracing::warn!(
                error = %err,
                code = err.code(),
                method = %req.method(),
                path = %req.uri().path(),
                "request rejected by auth gate"
            );
            state.gate.responder().respond(&err)
        }
    }
}
