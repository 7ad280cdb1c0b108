//! Errors raised while issuing and validating tokens.

use thiserror::Error;

/// Public-key resolution failures reported by a [`PublicKeyResolver`].
///
/// [`PublicKeyResolver`]: super::resolver::PublicKeyResolver
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no public key found for kid {0}")]
    NotFound(String),
    #[error("public key lookup timed out")]
    Timeout,
    #[error("public key backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    // construction / issuance
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("no private key registered for kid {kid}")]
    UnknownKey { kid: String },
    #[error("invalid key material: {0}")]
    InvalidKey(String),
    #[error("invalid claims: {0}")]
    InvalidClaims(&'static str),
    #[error("signing token")]
    Signing(#[source] jsonwebtoken::errors::Error),

    // validation
    #[error("malformed token: {0}")]
    MalformedToken(&'static str),
    #[error("unable to resolve public key for kid {kid}")]
    KeyResolution {
        kid: String,
        #[source]
        source: ResolveError,
    },
    #[error("token has expired")]
    ExpiredToken,
    #[error("invalid token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
}

impl AuthError {
    /// Stable label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            Self::UnknownKey { .. } => "unknown_key",
            Self::InvalidKey(_) => "invalid_key",
            Self::InvalidClaims(_) => "invalid_claims",
            Self::Signing(_) => "signing",
            Self::MalformedToken(_) => "malformed",
            Self::KeyResolution { .. } => "key_resolution",
            Self::ExpiredToken => "expired",
            Self::InvalidToken(_) => "invalid",
        }
    }
}
