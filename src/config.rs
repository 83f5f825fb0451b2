/*
 * Responsibility
 * - 環境変数の読み込み (listen addr, CORS, token/gate 設定, login accounts)
 * - 設定値のバリデーション (不足・不正なら起動失敗)
 * - 起動後は不変。AppState 経由で各コンポーネントに渡す
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderName;

use crate::services::auth::credentials::StaticAccount;
use crate::services::auth::token_codec::{SharedSecret, SigningAlgorithm};
use crate::services::auth::whitelist::{PathPattern, WhitelistRule};

/// Minimum HMAC key length accepted in production (256 bits).
pub const MIN_SECRET_LENGTH: usize = 32;

pub const DEFAULT_ROLE_CLAIM: &str = "role:key";
pub const DEFAULT_TOKEN_PREFIX: &str = "Bearer ";
pub const DEFAULT_TOKEN_TTL_SECONDS: u64 = 6 * 60 * 60;
pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
pub const DEFAULT_LOGOUT_PATH: &str = "/auth/logout";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// API docs, schema endpoints and the health probe.
pub const DEFAULT_WHITELIST: &[&str] = &[
    "/swagger-ui.html",
    "/swagger-ui/*",
    "/swagger-resources/**",
    "/v2/api-docs",
    "/v3/api-docs",
    "/webjars/**",
    "GET /api/v1/health",
    "HEAD /api/v1/health",
];

const RESERVED_CLAIMS: &[&str] = &["iss", "sub", "exp", "iat"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn parse(value: Option<&str>) -> Self {
        match value
            .unwrap_or("development")
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Everything the gate and the token codec need. Built once at startup.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub secret: SharedSecret,
    pub algorithm: SigningAlgorithm,
    pub issuer: String,
    pub role_claim: String,
    pub token_header: HeaderName,
    pub token_prefix: String,
    pub token_ttl: Duration,
    pub whitelist: Vec<WhitelistRule>,
    pub login_path: String,
    pub logout_path: String,
}

impl SecurityConfig {
    /// Defaults for everything except the secret and issuer.
    pub fn new(secret: SharedSecret, issuer: impl Into<String>) -> Self {
        Self {
            secret,
            algorithm: SigningAlgorithm::default(),
            issuer: issuer.into(),
            role_claim: DEFAULT_ROLE_CLAIM.to_string(),
            token_header: axum::http::header::AUTHORIZATION,
            token_prefix: DEFAULT_TOKEN_PREFIX.to_string(),
            token_ttl: Duration::from_secs(DEFAULT_TOKEN_TTL_SECONDS),
            whitelist: default_whitelist(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            logout_path: DEFAULT_LOGOUT_PATH.to_string(),
        }
    }

    fn from_lookup<F>(lookup: &F, app_env: AppEnv) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("AUTH_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("AUTH_SECRET"))?;
        if app_env.is_production() && secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::Invalid("AUTH_SECRET"));
        }

        let issuer = lookup("AUTH_ISSUER")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("AUTH_ISSUER"))?;

        let mut config = Self::new(SharedSecret::new(secret), issuer);

        if let Some(alg) = lookup("AUTH_ALGORITHM") {
            config.algorithm = alg
                .parse()
                .map_err(|_| ConfigError::Invalid("AUTH_ALGORITHM"))?;
        }

        if let Some(claim) = lookup("AUTH_ROLE_CLAIM") {
            let claim = claim.trim();
            if claim.is_empty() || RESERVED_CLAIMS.contains(&claim) {
                return Err(ConfigError::Invalid("AUTH_ROLE_CLAIM"));
            }
            config.role_claim = claim.to_string();
        }

        if let Some(name) = lookup("AUTH_TOKEN_HEADER") {
            config.token_header = HeaderName::from_bytes(name.trim().as_bytes())
                .map_err(|_| ConfigError::Invalid("AUTH_TOKEN_HEADER"))?;
        }

        if let Some(prefix) = lookup("AUTH_TOKEN_PREFIX") {
            if prefix.is_empty() {
                return Err(ConfigError::Invalid("AUTH_TOKEN_PREFIX"));
            }
            config.token_prefix = prefix;
        }

        if let Some(ttl) = lookup("AUTH_TOKEN_TTL_SECONDS") {
            let ttl = ttl
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Invalid("AUTH_TOKEN_TTL_SECONDS"))?;
            config.token_ttl = Duration::from_secs(ttl);
        }

        if let Some(list) = lookup("AUTH_WHITELIST") {
            config.whitelist = split_list(&list)
                .map(WhitelistRule::from_str)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| ConfigError::Invalid("AUTH_WHITELIST"))?;
        }

        if let Some(path) = lookup("AUTH_LOGIN_PATH") {
            config.login_path = valid_path(path, "AUTH_LOGIN_PATH")?;
        }

        if let Some(path) = lookup("AUTH_LOGOUT_PATH") {
            config.logout_path = valid_path(path, "AUTH_LOGOUT_PATH")?;
        }

        // Both are POST routes; the router cannot register one path twice.
        if config.login_path == config.logout_path {
            return Err(ConfigError::Invalid("AUTH_LOGOUT_PATH"));
        }

        Ok(config)
    }
}

pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,
    pub security: SecurityConfig,
    pub accounts: Vec<StaticAccount>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = lookup("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV").as_deref());

        let cors_allowed_origins = split_list(&lookup("CORS_ALLOWED_ORIGINS").unwrap_or_default())
            .map(str::to_string)
            .collect::<Vec<_>>();

        let request_timeout = lookup("REQUEST_TIMEOUT_SECONDS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS));

        let body_limit_bytes = lookup("REQUEST_BODY_LIMIT_BYTES")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_BODY_LIMIT_BYTES);

        let security = SecurityConfig::from_lookup(&lookup, app_env)?;

        // `;`-separated: PHC hashes contain commas.
        let accounts = lookup("AUTH_USERS")
            .unwrap_or_default()
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(StaticAccount::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ConfigError::Invalid("AUTH_USERS"))?;

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            request_timeout,
            body_limit_bytes,
            security,
            accounts,
        })
    }
}

pub fn default_whitelist() -> Vec<WhitelistRule> {
    DEFAULT_WHITELIST
        .iter()
        .filter_map(|s| s.parse::<WhitelistRule>().ok())
        .collect()
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn valid_path(path: String, key: &'static str) -> Result<String, ConfigError> {
    let path = path.trim().to_string();
    PathPattern::parse(&path).map_err(|_| ConfigError::Invalid(key))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::http::Method;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(move |key| env.get(key).cloned())
    }

    const BASE: &[(&str, &str)] = &[("AUTH_SECRET", "dev-secret"), ("AUTH_ISSUER", "l")];

    #[test]
    fn defaults_follow_the_documented_values() {
        let config = load(BASE).unwrap();
        let sec = &config.security;

        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.app_env, AppEnv::Development);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.body_limit_bytes, 1024 * 1024);
        assert_eq!(sec.issuer, "l");
        assert_eq!(sec.algorithm, SigningAlgorithm::Hs256);
        assert_eq!(sec.role_claim, "role:key");
        assert_eq!(sec.token_header, axum::http::header::AUTHORIZATION);
        assert_eq!(sec.token_prefix, "Bearer ");
        assert_eq!(sec.token_ttl, Duration::from_secs(21_600));
        assert_eq!(sec.login_path, "/auth/login");
        assert_eq!(sec.logout_path, "/auth/logout");
        assert_eq!(sec.whitelist.len(), DEFAULT_WHITELIST.len());
        assert!(config.accounts.is_empty());
    }

    #[test]
    fn secret_and_issuer_are_required() {
        assert_eq!(
            load(&[("AUTH_ISSUER", "l")]).err(),
            Some(ConfigError::Missing("AUTH_SECRET"))
        );
        assert_eq!(
            load(&[("AUTH_SECRET", "x")]).err(),
            Some(ConfigError::Missing("AUTH_ISSUER"))
        );
    }

    #[test]
    fn production_rejects_short_secrets() {
        let mut pairs = BASE.to_vec();
        pairs.push(("APP_ENV", "production"));
        assert_eq!(load(&pairs).err(), Some(ConfigError::Invalid("AUTH_SECRET")));

        let long = "x".repeat(MIN_SECRET_LENGTH);
        let pairs = [
            ("APP_ENV", "prod"),
            ("AUTH_SECRET", long.as_str()),
            ("AUTH_ISSUER", "l"),
        ];
        assert!(load(&pairs).unwrap().app_env.is_production());
    }

    #[test]
    fn whitelist_is_parsed_from_the_environment() {
        let mut pairs = BASE.to_vec();
        pairs.push(("AUTH_WHITELIST", "/public/**, GET /status"));
        let config = load(&pairs).unwrap();

        let rules = &config.security.whitelist;
        assert_eq!(rules.len(), 2);
        assert!(rules[0].matches("/public/x", &Method::DELETE));
        assert!(rules[1].matches("/status", &Method::GET));
        assert!(!rules[1].matches("/status", &Method::POST));
    }

    #[test]
    fn invalid_values_are_reported_by_key() {
        let cases: &[(&str, &str, &str)] = &[
            ("AUTH_WHITELIST", "/a/**/b", "AUTH_WHITELIST"),
            ("AUTH_ROLE_CLAIM", "sub", "AUTH_ROLE_CLAIM"),
            ("AUTH_ALGORITHM", "RS256", "AUTH_ALGORITHM"),
            ("AUTH_TOKEN_TTL_SECONDS", "0", "AUTH_TOKEN_TTL_SECONDS"),
            ("AUTH_TOKEN_HEADER", "bad header", "AUTH_TOKEN_HEADER"),
            ("AUTH_TOKEN_PREFIX", "", "AUTH_TOKEN_PREFIX"),
            ("AUTH_LOGIN_PATH", "login", "AUTH_LOGIN_PATH"),
            ("AUTH_USERS", "alice:admin", "AUTH_USERS"),
            ("AUTH_USERS", "alice:admin:0123abcd", "AUTH_USERS"),
            ("AUTH_LOGOUT_PATH", "/auth/login", "AUTH_LOGOUT_PATH"),
            ("AUTH_LOGIN_PATH", "/auth/logout", "AUTH_LOGOUT_PATH"),
        ];

        for &(key, value, reported) in cases {
            let mut pairs = BASE.to_vec();
            pairs.push((key, value));
            assert_eq!(
                load(&pairs).err(),
                Some(ConfigError::Invalid(reported)),
                "{key}={value}"
            );
        }
    }

    #[test]
    fn overrides_are_applied() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("AUTH_ALGORITHM", "HS512"),
            ("AUTH_ROLE_CLAIM", "roles"),
            ("AUTH_TOKEN_HEADER", "X-Access-Token"),
            ("AUTH_TOKEN_TTL_SECONDS", "60"),
            ("PORT", "8080"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, ,https://b.example"),
        ]);
        let config = load(&pairs).unwrap();

        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.security.algorithm, SigningAlgorithm::Hs512);
        assert_eq!(config.security.role_claim, "roles");
        assert_eq!(config.security.token_header.as_str(), "x-access-token");
        assert_eq!(config.security.token_ttl, Duration::from_secs(60));
        assert_eq!(
            config.cors_allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn default_whitelist_covers_api_docs() {
        let rules = default_whitelist();
        assert!(rules.iter().any(|r| r.matches("/swagger-ui/index.html", &Method::GET)));
        assert!(rules.iter().any(|r| r.matches("/webjars/x/y.js", &Method::GET)));
    }

    #[test]
    fn health_is_open_to_get_and_head_only() {
        let rules = default_whitelist();
        let open = |method: &Method| rules.iter().any(|r| r.matches("/api/v1/health", method));

        assert!(open(&Method::GET));
        assert!(open(&Method::HEAD));
        assert!(!open(&Method::POST));
    }

    #[test]
    fn accounts_are_semicolon_separated_phc_entries() {
        let phc = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
        let users = format!("alice:user:{phc}; root:admin:{phc};");
        let mut pairs = BASE.to_vec();
        pairs.push(("AUTH_USERS", users.as_str()));

        let config = load(&pairs).unwrap();
        let names: Vec<_> = config.accounts.iter().map(|a| a.username.as_str()).collect();
        assert_eq!(names, ["alice", "root"]);
        assert_eq!(config.accounts[1].role_key, "admin");
    }
}
