//! Compact signed token (JWT, HMAC family) issuance and verification.
//!
//! Issuance goes through `jsonwebtoken`. Verification is done here by hand so
//! that each failure maps onto exactly one `AuthError` and the checks run in a
//! fixed order:
//! 1. shape (three non-empty segments, base64url signature)
//! 2. signature over the raw `header.payload` text (constant-time compare)
//! 3. header / payload decoding
//! 4. `exp` strictly in the future
//! 5. `iss` equals the configured issuer
//!
//! Because the signature is checked before anything is decoded, altering header
//! or payload bytes without re-signing always surfaces as `InvalidSignature`.

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use sha2::{Sha256, Sha384, Sha512};
use tracing::error;

use crate::error::AppError;
use crate::services::auth::clock::Clock;
use crate::services::auth::error::AuthError;

/// HMAC key shared by issuer and verifier.
///
/// Key material is intentionally not printable via Debug.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret(Box<[u8]>);

impl SharedSecret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into().into_boxed_slice())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigningAlgorithm {
    #[default]
    Hs256,
    Hs384,
    Hs512,
}

impl SigningAlgorithm {
    pub fn jwt_algorithm(self) -> Algorithm {
        match self {
            Self::Hs256 => Algorithm::HS256,
            Self::Hs384 => Algorithm::HS384,
            Self::Hs512 => Algorithm::HS512,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported signing algorithm: {0}")]
pub struct UnsupportedAlgorithm(pub String);

impl FromStr for SigningAlgorithm {
    type Err = UnsupportedAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "HS256" => Ok(Self::Hs256),
            "HS384" => Ok(Self::Hs384),
            "HS512" => Ok(Self::Hs512),
            other => Err(UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Token payload.
///
/// Registered claims are typed; everything else (including the role claim,
/// whose key is configurable) lands in `extra`. `extra` is a sorted map, so
/// serialization order is stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

pub struct TokenCodec {
    secret: SharedSecret,
    encoding_key: EncodingKey,
    algorithm: SigningAlgorithm,
    issuer: String,
    role_claim: String,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("role_claim", &self.role_claim)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(
        secret: SharedSecret,
        algorithm: SigningAlgorithm,
        issuer: impl Into<String>,
        role_claim: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AppError> {
        if secret.is_empty() {
            error!("token signing secret is empty");
            return Err(AppError::Internal);
        }

        let encoding_key = EncodingKey::from_secret(secret.expose());

        Ok(Self {
            secret,
            encoding_key,
            algorithm,
            issuer: issuer.into(),
            role_claim: role_claim.into(),
            clock,
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn role_claim(&self) -> &str {
        &self.role_claim
    }

    pub fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    /// Issue a token for `subject` carrying `role_key`, valid for `ttl` from now.
    pub fn issue(&self, subject: &str, role_key: &str, ttl: Duration) -> Result<String, AppError> {
        let now = self.clock.unix_seconds();
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

        let mut extra = Map::new();
        extra.insert(
            self.role_claim.clone(),
            Value::String(role_key.to_string()),
        );

        let claims = Claims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            exp: now.saturating_add(ttl),
            iat: Some(now),
            extra,
        };

        let mut header = Header::new(self.algorithm.jwt_algorithm());
        header.typ = Some("JWT".to_string());
        jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign token");
            AppError::Internal
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut segments = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(AuthError::MalformedToken("expected three segments"));
        };

        if header_b64.is_empty() || payload_b64.is_empty() || signature_b64.is_empty() {
            return Err(AuthError::MalformedToken("empty segment"));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| AuthError::MalformedToken("signature is not base64url"))?;

        let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];
        if !self.signature_matches(signing_input.as_bytes(), &signature) {
            return Err(AuthError::InvalidSignature);
        }

        let header: Header = decode_segment(header_b64, "undecodable header")?;
        if header.alg != self.algorithm.jwt_algorithm() {
            return Err(AuthError::MalformedToken("unexpected alg"));
        }

        let claims: Claims = decode_segment(payload_b64, "undecodable payload")?;

        if claims.exp <= self.clock.unix_seconds() {
            return Err(AuthError::ExpiredToken);
        }
        if claims.iss != self.issuer {
            return Err(AuthError::IssuerMismatch);
        }

        Ok(claims)
    }

    fn signature_matches(&self, message: &[u8], signature: &[u8]) -> bool {
        let key = self.secret.expose();
        match self.algorithm {
            SigningAlgorithm::Hs256 => mac_matches::<Hmac<Sha256>>(key, message, signature),
            SigningAlgorithm::Hs384 => mac_matches::<Hmac<Sha384>>(key, message, signature),
            SigningAlgorithm::Hs512 => mac_matches::<Hmac<Sha512>>(key, message, signature),
        }
    }
}

// `verify_slice` compares in constant time.
fn mac_matches<M>(key: &[u8], message: &[u8], signature: &[u8]) -> bool
where
    M: Mac + hmac::digest::KeyInit,
{
    let Ok(mut mac) = <M as Mac>::new_from_slice(key) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(signature).is_ok()
}

fn decode_segment<T: DeserializeOwned>(
    segment: &str,
    reason: &'static str,
) -> Result<T, AuthError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::MalformedToken(reason))?;
    serde_json::from_slice(&bytes).map_err(|_| AuthError::MalformedToken(reason))
}
