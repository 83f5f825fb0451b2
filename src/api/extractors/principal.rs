use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Response;

use crate::services::auth::{AuthError, Principal, failure::FailureResponder};

/// Handler で、 gate が解決した Principal を受け取るための extractor
/// middleware が Principal を request.extensions() に insert 済みである前提
/// 見つからない場合は 401 を返す（whitelist 上のパス・ミドルウェア未設定）
pub struct PrincipalExtractor(pub Principal);

impl<S> FromRequestParts<S> for PrincipalExtractor
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(PrincipalExtractor)
            .ok_or_else(|| FailureResponder.respond(&AuthError::MissingToken))
    }
}
