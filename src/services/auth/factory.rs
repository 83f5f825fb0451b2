/// Factory: build `TokenCodec` + `AuthorizationGate` from `SecurityConfig`.
use std::sync::Arc;

use crate::config::SecurityConfig;
use crate::error::AppError;
use crate::services::auth::clock::Clock;
use crate::services::auth::gate::AuthorizationGate;
use crate::services::auth::policy::RoleRequirement;
use crate::services::auth::token_codec::TokenCodec;

pub fn build_gate(
    config: &SecurityConfig,
    clock: Arc<dyn Clock>,
    requirements: Vec<RoleRequirement>,
) -> Result<Arc<AuthorizationGate>, AppError> {
    let codec = TokenCodec::new(
        config.secret.clone(),
        config.algorithm,
        config.issuer.clone(),
        config.role_claim.clone(),
        clock,
    )?;

    let gate = AuthorizationGate::from_config(config, Arc::new(codec)).map_err(|e| {
        tracing::error!(error = %e, "invalid login path for the gate whitelist");
        AppError::Internal
    })?;

    let gate = requirements
        .into_iter()
        .fold(gate, |gate, req| gate.with_requirement(req));

    Ok(Arc::new(gate))
}
