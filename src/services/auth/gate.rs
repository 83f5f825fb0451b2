//! Per-request authentication / authorization decision.
//!
//! ```text
//! START ─┬─ whitelisted ──────────────────────────────► WHITELISTED   (pass)
//!        ├─ no header / no prefix ────────────────────► TOKEN_MISSING (401)
//!        ├─ verify fails ─────────────────────────────► TOKEN_INVALID (401)
//!        └─ verify ok ─► AUTHENTICATED ─┬─ no role / policy deny ─► FORBIDDEN (403)
//!                                       └─ otherwise ─────────────► AUTHORIZED (pass)
//! ```
//!
//! The gate only decides. Writing the rejection response and attaching the
//! principal to the request is up to the caller (see `middleware::auth::access`).

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, Method};

use crate::config::SecurityConfig;
use crate::services::auth::error::AuthError;
use crate::services::auth::failure::FailureResponder;
use crate::services::auth::policy::{AccessDecision, AccessPolicy, RoleKeyPolicy, RoleRequirement};
use crate::services::auth::principal::{Principal, PrincipalResolver};
use crate::services::auth::token_codec::TokenCodec;
use crate::services::auth::whitelist::{PatternError, WhitelistMatcher, WhitelistRule};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Whitelisted,
    Authorized(Principal),
    Rejected(AuthError),
}

/// Terminal state reached by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Whitelisted,
    TokenMissing,
    TokenInvalid,
    Forbidden,
    Authorized,
}

impl GateDecision {
    pub fn state(&self) -> GateState {
        match self {
            Self::Whitelisted => GateState::Whitelisted,
            Self::Authorized(_) => GateState::Authorized,
            Self::Rejected(AuthError::MissingToken) => GateState::TokenMissing,
            Self::Rejected(AuthError::MissingRole | AuthError::InsufficientPrivilege) => {
                GateState::Forbidden
            }
            Self::Rejected(_) => GateState::TokenInvalid,
        }
    }
}

#[derive(Debug)]
pub struct AuthorizationGate {
    codec: Arc<TokenCodec>,
    whitelist: WhitelistMatcher,
    resolver: PrincipalResolver,
    policy: Arc<dyn AccessPolicy>,
    requirements: Vec<RoleRequirement>,
    responder: FailureResponder,
    token_header: HeaderName,
    token_prefix: String,
}

impl AuthorizationGate {
    pub fn new(
        codec: Arc<TokenCodec>,
        whitelist: WhitelistMatcher,
        resolver: PrincipalResolver,
        token_header: HeaderName,
        token_prefix: impl Into<String>,
    ) -> Self {
        Self {
            codec,
            whitelist,
            resolver,
            policy: Arc::new(RoleKeyPolicy),
            requirements: Vec::new(),
            responder: FailureResponder,
            token_header,
            token_prefix: token_prefix.into(),
        }
    }

    /// Gate wired from configuration. `POST <login_path>` is always let through.
    pub fn from_config(config: &SecurityConfig, codec: Arc<TokenCodec>) -> Result<Self, PatternError> {
        let mut rules = config.whitelist.clone();
        rules.push(WhitelistRule::with_method(Method::POST, &config.login_path)?);

        Ok(Self::new(
            codec,
            WhitelistMatcher::new(rules),
            PrincipalResolver::new(config.role_claim.clone()),
            config.token_header.clone(),
            config.token_prefix.clone(),
        ))
    }

    pub fn with_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_requirement(mut self, requirement: RoleRequirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn responder(&self) -> &FailureResponder {
        &self.responder
    }

    pub fn evaluate(&self, method: &Method, path: &str, headers: &HeaderMap) -> GateDecision {
        if self.whitelist.matches(path, method) {
            return GateDecision::Whitelisted;
        }

        let principal = match self.authenticate(headers) {
            Ok(principal) => principal,
            Err(err) => return GateDecision::Rejected(err),
        };

        match self.authorize(&principal, method, path) {
            Ok(()) => GateDecision::Authorized(principal),
            Err(err) => GateDecision::Rejected(err),
        }
    }

    /// Header → verified claims → principal.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let token = self.bearer_token(headers)?;
        let claims = self.codec.verify(token)?;
        self.resolver.resolve(&claims)
    }

    /// Every requirement that applies to the request must be satisfied.
    pub fn authorize(
        &self,
        principal: &Principal,
        method: &Method,
        path: &str,
    ) -> Result<(), AuthError> {
        let denied = self
            .requirements
            .iter()
            .filter(|req| req.applies_to(path, method))
            .any(|req| self.policy.decide(principal, &req.roles) == AccessDecision::Deny);

        if denied {
            Err(AuthError::InsufficientPrivilege)
        } else {
            Ok(())
        }
    }

    fn bearer_token<'a>(&self, headers: &'a HeaderMap) -> Result<&'a str, AuthError> {
        headers
            .get(&self.token_header)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix(self.token_prefix.as_str()))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::{HeaderValue, header};

    use super::*;
    use crate::services::auth::clock::ManualClock;
    use crate::services::auth::token_codec::{SharedSecret, SigningAlgorithm};

    const SIX_HOURS: Duration = Duration::from_secs(6 * 60 * 60);

    fn codec(clock: Arc<ManualClock>) -> Arc<TokenCodec> {
        Arc::new(
            TokenCodec::new(
                SharedSecret::new(b"gate-test-secret".to_vec()),
                SigningAlgorithm::Hs256,
                "l",
                "role:key",
                clock,
            )
            .unwrap(),
        )
    }

    fn gate_with_clock(clock: Arc<ManualClock>) -> AuthorizationGate {
        let rules = ["/swagger-ui/*", "/webjars/**", "POST /auth/login"]
            .iter()
            .map(|s| s.parse::<WhitelistRule>().unwrap())
            .collect();

        AuthorizationGate::new(
            codec(clock),
            WhitelistMatcher::new(rules),
            PrincipalResolver::new("role:key"),
            header::AUTHORIZATION,
            "Bearer ",
        )
        .with_requirement(RoleRequirement::new("/admin/**", ["admin"]).unwrap())
    }

    fn gate() -> AuthorizationGate {
        gate_with_clock(Arc::new(ManualClock::at_unix(1_700_000_000)))
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn whitelisted_paths_pass_without_header() {
        let gate = gate();
        let decision = gate.evaluate(&Method::GET, "/swagger-ui/index.html", &HeaderMap::new());
        assert_eq!(decision, GateDecision::Whitelisted);

        let decision = gate.evaluate(&Method::POST, "/auth/login", &HeaderMap::new());
        assert_eq!(decision.state(), GateState::Whitelisted);
    }

    #[test]
    fn whitelist_wins_even_with_a_bad_token() {
        let decision = gate().evaluate(&Method::GET, "/webjars/a.js", &bearer("garbage"));
        assert_eq!(decision.state(), GateState::Whitelisted);
    }

    #[test]
    fn missing_or_unprefixed_header_is_token_missing() {
        let gate = gate();
        assert_eq!(
            gate.evaluate(&Method::GET, "/orders", &HeaderMap::new()).state(),
            GateState::TokenMissing
        );

        for raw in ["Token abc", "bearer abc", "Bearer", "Bearer    "] {
            let mut headers = HeaderMap::new();
            headers.insert(header::AUTHORIZATION, HeaderValue::from_str(raw).unwrap());
            assert_eq!(
                gate.evaluate(&Method::GET, "/orders", &headers),
                GateDecision::Rejected(AuthError::MissingToken),
                "{raw:?}"
            );
        }
    }

    #[test]
    fn login_is_only_whitelisted_for_post() {
        let decision = gate().evaluate(&Method::GET, "/auth/login", &HeaderMap::new());
        assert_eq!(decision.state(), GateState::TokenMissing);
    }

    #[test]
    fn garbage_token_is_token_invalid() {
        let decision = gate().evaluate(&Method::GET, "/orders", &bearer("not-a-jwt"));
        assert_eq!(decision.state(), GateState::TokenInvalid);
        assert!(matches!(
            decision,
            GateDecision::Rejected(AuthError::MalformedToken(_))
        ));
    }

    #[test]
    fn valid_token_is_authorized_with_principal() {
        let gate = gate();
        let token = gate.codec().issue("alice", "admin", SIX_HOURS).unwrap();

        let decision = gate.evaluate(&Method::GET, "/orders", &bearer(&token));
        assert_eq!(
            decision,
            GateDecision::Authorized(Principal {
                subject: "alice".to_string(),
                roles: vec!["admin".to_string()],
            })
        );
    }

    #[test]
    fn expired_token_is_token_invalid() {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let gate = gate_with_clock(clock.clone());
        let token = gate.codec().issue("alice", "admin", SIX_HOURS).unwrap();

        clock.advance(SIX_HOURS);
        assert_eq!(
            gate.evaluate(&Method::GET, "/orders", &bearer(&token)),
            GateDecision::Rejected(AuthError::ExpiredToken)
        );
    }

    #[test]
    fn roleless_token_is_forbidden() {
        let gate = gate();
        let token = gate.codec().issue("alice", "", SIX_HOURS).unwrap();

        let decision = gate.evaluate(&Method::GET, "/orders", &bearer(&token));
        assert_eq!(decision, GateDecision::Rejected(AuthError::MissingRole));
        assert_eq!(decision.state(), GateState::Forbidden);
    }

    #[test]
    fn role_requirement_denial_is_forbidden() {
        let gate = gate();
        let user = gate.codec().issue("bob", "user", SIX_HOURS).unwrap();
        let admin = gate.codec().issue("alice", "admin", SIX_HOURS).unwrap();

        assert_eq!(
            gate.evaluate(&Method::GET, "/admin/stats", &bearer(&user)),
            GateDecision::Rejected(AuthError::InsufficientPrivilege)
        );
        assert_eq!(
            gate.evaluate(&Method::GET, "/admin/stats", &bearer(&admin)).state(),
            GateState::Authorized
        );
    }

    #[derive(Debug)]
    struct DenyAll;

    impl AccessPolicy for DenyAll {
        fn decide(&self, _principal: &Principal, _required: &[String]) -> AccessDecision {
            AccessDecision::Deny
        }
    }

    #[test]
    fn policy_is_only_consulted_for_matching_requirements() {
        let gate = gate().with_policy(Arc::new(DenyAll));
        let token = gate.codec().issue("alice", "admin", SIX_HOURS).unwrap();

        assert_eq!(
            gate.evaluate(&Method::GET, "/orders", &bearer(&token)).state(),
            GateState::Authorized
        );
        assert_eq!(
            gate.evaluate(&Method::GET, "/admin", &bearer(&token)).state(),
            GateState::Forbidden
        );
    }

    #[test]
    fn custom_header_and_prefix() {
        let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
        let gate = AuthorizationGate::new(
            codec(clock),
            WhitelistMatcher::default(),
            PrincipalResolver::new("role:key"),
            HeaderName::from_static("x-access-token"),
            "JWT ",
        );
        let token = gate.codec().issue("alice", "admin", SIX_HOURS).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-access-token",
            HeaderValue::from_str(&format!("JWT {token}")).unwrap(),
        );
        assert_eq!(
            gate.evaluate(&Method::GET, "/orders", &headers).state(),
            GateState::Authorized
        );
        assert_eq!(
            gate.evaluate(&Method::GET, "/orders", &bearer(&token)).state(),
            GateState::TokenMissing
        );
    }
}
