//! Login-side credential check.
//!
//! The gate never calls this. It only backs `POST /auth/login`, which turns a
//! successful check into a token via `TokenCodec::issue`. Real deployments plug
//! in their own user store; `StaticCredentials` covers a fixed account list
//! loaded from configuration.

use std::collections::HashMap;
use std::str::FromStr;
use std::{fmt, future::Future, pin::Pin};

use argon2::{Argon2, PasswordHash, PasswordVerifier};

/// Verified against when the username is unknown, so a miss costs the same as a
/// wrong password. Default argon2id parameters; matches no password.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Who logged in and which role key goes into their token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub subject: String,
    pub role_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("credential backend failure: {0}")]
    Backend(String),
}

/// Credential check result:
/// - `Ok(Some(_))`: credentials accepted
/// - `Ok(None)`: unknown user or wrong password (indistinguishable on purpose)
/// - `Err(_)`: backend failure
pub trait CredentialVerifier: Send + Sync {
    fn verify<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Account>, CredentialError>> + Send + 'a>>;
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AccountParseError {
    #[error("expected username:role_key:phc_hash")]
    Shape,
    #[error("password hash is not a PHC string")]
    Hash,
}

/// One configured account: `username:role_key:<argon2 PHC string>`.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticAccount {
    pub username: String,
    pub role_key: String,
    password_hash: String,
}

impl fmt::Debug for StaticAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticAccount")
            .field("username", &self.username)
            .field("role_key", &self.role_key)
            .finish_non_exhaustive()
    }
}

impl FromStr for StaticAccount {
    type Err = AccountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // PHC strings use `$`, `=` and `,` but never `:`.
        let mut parts = s.trim().splitn(3, ':');
        let (Some(username), Some(role_key), Some(hash)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(AccountParseError::Shape);
        };
        if username.is_empty() || role_key.is_empty() {
            return Err(AccountParseError::Shape);
        }

        PasswordHash::new(hash).map_err(|_| AccountParseError::Hash)?;

        Ok(Self {
            username: username.to_string(),
            role_key: role_key.to_string(),
            password_hash: hash.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    accounts: HashMap<String, StaticAccount>,
}

impl StaticCredentials {
    pub fn new(accounts: impl IntoIterator<Item = StaticAccount>) -> Self {
        Self {
            accounts: accounts
                .into_iter()
                .map(|a| (a.username.clone(), a))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Blocking: argon2 is deliberately slow.
fn password_matches(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "stored password hash failed to parse");
            false
        }
    }
}

impl CredentialVerifier for StaticCredentials {
    fn verify<'a>(
        &'a self,
        username: &'a str,
        password: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Account>, CredentialError>> + Send + 'a>> {
        Box::pin(async move {
            let account = self.accounts.get(username);
            let hash = account
                .map(|a| a.password_hash.clone())
                .unwrap_or_else(|| DUMMY_HASH.to_string());
            let password = password.to_string();

            let matched = tokio::task::spawn_blocking(move || password_matches(&password, &hash))
                .await
                .map_err(|e| CredentialError::Backend(e.to_string()))?;

            Ok(account.filter(|_| matched).map(|a| Account {
                subject: a.username.clone(),
                role_key: a.role_key.clone(),
            }))
        })
    }
}
