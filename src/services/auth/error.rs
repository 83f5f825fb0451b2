use thiserror::Error;

/// Why a request was turned away by the gate.
///
/// The `Display` text is what ends up in the `data` field of the failure body,
/// so it must never carry token contents or key material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("malformed token: {0}")]
    MalformedToken(&'static str),
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    ExpiredToken,
    #[error("token issuer mismatch")]
    IssuerMismatch,
    #[error("token carries no role")]
    MissingRole,
    #[error("insufficient privilege")]
    InsufficientPrivilege,
}

/// Response grouping: 401 vs 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Unauthenticated,
    Unauthorized,
}

impl AuthError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MissingToken
            | Self::MalformedToken(_)
            | Self::InvalidSignature
            | Self::ExpiredToken
            | Self::IssuerMismatch => FailureKind::Unauthenticated,
            Self::MissingRole | Self::InsufficientPrivilege => FailureKind::Unauthorized,
        }
    }

    /// Stable identifier for log fields.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "MISSING_TOKEN",
            Self::MalformedToken(_) => "MALFORMED_TOKEN",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::ExpiredToken => "EXPIRED_TOKEN",
            Self::IssuerMismatch => "ISSUER_MISMATCH",
            Self::MissingRole => "MISSING_ROLE",
            Self::InsufficientPrivilege => "INSUFFICIENT_PRIVILEGE",
        }
    }
}
