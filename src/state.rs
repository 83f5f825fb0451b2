/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - gate: AuthorizationGate (TokenCodec を内包)
 *   - credentials: login 用の CredentialVerifier
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;
use std::time::Duration;

use crate::services::auth::{AuthorizationGate, credentials::CredentialVerifier};

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AuthorizationGate>,
    pub credentials: Arc<dyn CredentialVerifier>,
    pub token_ttl: Duration,
}

impl AppState {
    pub fn new(
        gate: Arc<AuthorizationGate>,
        credentials: Arc<dyn CredentialVerifier>,
        token_ttl: Duration,
    ) -> Self {
        Self {
            gate,
            credentials,
            token_ttl,
        }
    }
}
