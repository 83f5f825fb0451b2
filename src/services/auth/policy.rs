//! Role requirements checked after authentication.
//!
//! The gate finds the requirements that apply to a request and asks an
//! `AccessPolicy` whether the resolved principal satisfies them. A denial is
//! the FORBIDDEN transition (403).

use std::fmt;

use axum::http::Method;

use crate::services::auth::principal::Principal;
use crate::services::auth::whitelist::{PatternError, WhitelistRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
}

pub trait AccessPolicy: Send + Sync + fmt::Debug {
    /// `required` is never empty when called by the gate.
    fn decide(&self, principal: &Principal, required: &[String]) -> AccessDecision;
}

/// Allows when the principal holds at least one of the required role keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleKeyPolicy;

impl AccessPolicy for RoleKeyPolicy {
    fn decide(&self, principal: &Principal, required: &[String]) -> AccessDecision {
        if required.is_empty() || required.iter().any(|role| principal.has_role(role)) {
            AccessDecision::Allow
        } else {
            AccessDecision::Deny
        }
    }
}

/// Route-scoped role requirement, e.g. `/api/v1/admin/**` needs `admin`.
#[derive(Debug, Clone)]
pub struct RoleRequirement {
    pub rule: WhitelistRule,
    pub roles: Vec<String>,
}

impl RoleRequirement {
    pub fn new<I, S>(rule: &str, roles: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            rule: rule.parse()?,
            roles: roles.into_iter().map(Into::into).collect(),
        })
    }

    pub fn applies_to(&self, path: &str, method: &Method) -> bool {
        self.rule.matches(path, method)
    }
}
