use serde::Serialize;
use serde_json::Value;

use crate::services::auth::error::AuthError;
use crate::services::auth::token_codec::Claims;

/// Identity attached to an authenticated request.
///
/// - `subject` is the token's `sub`, as issued by the login side
/// - `roles` are opaque role keys; mapping them to permissions is somebody else's job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub subject: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Debug, Clone)]
pub struct PrincipalResolver {
    role_claim: String,
}

impl PrincipalResolver {
    pub fn new(role_claim: impl Into<String>) -> Self {
        Self {
            role_claim: role_claim.into(),
        }
    }

    pub fn resolve(&self, claims: &Claims) -> Result<Principal, AuthError> {
        let roles = claims
            .get(&self.role_claim)
            .map(role_keys)
            .unwrap_or_default();

        if roles.is_empty() {
            return Err(AuthError::MissingRole);
        }

        Ok(Principal {
            subject: claims.sub.clone(),
            roles,
        })
    }
}

// Accepts a single role key or an array of them; blanks are dropped.
fn role_keys(value: &Value) -> Vec<String> {
    let keep = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    match value {
        Value::String(s) => keep(s).into_iter().collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .filter_map(keep)
            .collect(),
        _ => Vec::new(),
    }
}
