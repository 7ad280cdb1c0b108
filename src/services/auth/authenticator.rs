//! Token issuance and validation keyed by key id (`kid`).
//!
//! Tokens are compact JWS: `base64url(header).base64url(claims).signature`.
//! The header carries `alg` and the clear-text `kid` naming the key that
//! signed it. Exactly one algorithm is accepted, fixed at construction;
//! tokens announcing any other algorithm are rejected before the signature
//! is checked.

use std::fmt;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, Header, Validation, errors::ErrorKind};
use metrics::counter;

use super::claims::{Claims, expired_at};
use super::error::AuthError;
use super::keys::{KeyRegistry, PrivateKey, parse_algorithm};
use super::resolver::PublicKeyResolver;

/// Optional claim checks applied on validation.
#[derive(Debug, Clone, Default)]
pub struct AuthenticatorOptions {
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub leeway_seconds: u64,
}

pub struct Authenticator {
    algorithm: Algorithm,
    validation: Validation,
    leeway_seconds: u64,
    keys: KeyRegistry,
    resolver: Arc<dyn PublicKeyResolver>,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("Authenticator")
            .field("algorithm", &self.algorithm)
            .field("kids", &self.keys.kids())
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl Authenticator {
    pub fn new(
        algorithm: &str,
        resolver: Arc<dyn PublicKeyResolver>,
        keys: KeyRegistry,
    ) -> Result<Self, AuthError> {
        Self::with_options(algorithm, resolver, keys, AuthenticatorOptions::default())
    }

    pub fn with_options(
        algorithm: &str,
        resolver: Arc<dyn PublicKeyResolver>,
        keys: KeyRegistry,
        options: AuthenticatorOptions,
    ) -> Result<Self, AuthError> {
        let algorithm = parse_algorithm(algorithm)?;

        // `Validation::new` pins the accepted algorithm list to exactly this one.
        let mut validation = Validation::new(algorithm);
        // Expiry is checked after the signature, against `leeway_seconds`.
        validation.validate_exp = false;
        validation.validate_aud = options.audience.is_some();
        if let Some(audience) = &options.audience {
            validation.set_audience(&[audience]);
        }
        if let Some(issuer) = &options.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            algorithm,
            validation,
            leeway_seconds: options.leeway_seconds,
            keys,
            resolver,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn keys(&self) -> &KeyRegistry {
        &self.keys
    }

    pub fn add_key(&self, kid: impl Into<String>, key: PrivateKey) {
        self.keys.add_key(kid, key);
    }

    pub fn remove_key(&self, kid: &str) {
        self.keys.remove_key(kid);
    }

    /// Sign `claims` with the private key registered under `kid`.
    pub fn generate_token(&self, kid: &str, claims: &Claims) -> Result<String, AuthError> {
        if !claims.has_consistent_times() {
            return Err(AuthError::InvalidClaims("expiry is before issue time"));
        }

        let key = self.keys.get(kid).ok_or_else(|| AuthError::UnknownKey {
            kid: kid.to_string(),
        })?;

        let mut header = Header::new(self.algorithm);
        header.kid = Some(kid.to_string());

        let token = jsonwebtoken::encode(&header, claims, key.encoding_key()).map_err(|e| {
            tracing::error!(kid = %kid, error = %e, "failed to sign token");
            AuthError::Signing(e)
        })?;

        counter!("auth_tokens_issued_total").increment(1);
        Ok(token)
    }

    /// Verify `token` and rebuild the claims it carries.
    ///
    /// The only I/O is the resolver call; the registry is never touched, so
    /// any number of validations may run concurrently.
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let result = self.validate(token).await;

        let status = match &result {
            Ok(_) => "valid",
            Err(err) => err.kind(),
        };
        counter!("auth_token_validations_total", "status" => status).increment(1);

        result
    }

    async fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let kid = header_kid(token)?;

        let key = self
            .resolver
            .resolve(&kid)
            .await
            .map_err(|source| AuthError::KeyResolution {
                kid: kid.clone(),
                source,
            })?;

        let data = match jsonwebtoken::decode::<Claims>(token, &key, &self.validation) {
            Ok(data) => data,
            // An expired token is reported as such whatever else is wrong with it.
            Err(e)
                if matches!(e.kind(), ErrorKind::ExpiredSignature) || self.past_expiry(token) =>
            {
                return Err(AuthError::ExpiredToken);
            }
            Err(e) => return Err(AuthError::InvalidToken(e)),
        };

        if data.claims.is_expired_at(Utc::now(), self.leeway_seconds) {
            return Err(AuthError::ExpiredToken);
        }
        if !data.claims.has_consistent_times() {
            return Err(AuthError::MalformedToken("token expires before it was issued"));
        }

        Ok(data.claims)
    }

    /// Whether the unverified `exp` of `token` has passed. Only used to
    /// classify a rejection, never to accept a token.
    fn past_expiry(&self, token: &str) -> bool {
        unverified_exp(token)
            .is_some_and(|exp| expired_at(exp, Utc::now(), self.leeway_seconds))
    }
}

/// Read `exp` from the token payload without verifying anything.
fn unverified_exp(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let payload: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = payload.get("exp")?.as_i64()?;
    DateTime::from_timestamp(exp, 0)
}

/// Read the clear-text `kid` from the token header without verifying anything.
fn header_kid(token: &str) -> Result<String, AuthError> {
    let encoded = token
        .split('.')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or(AuthError::MalformedToken("token is empty"))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| AuthError::MalformedToken("token header is not base64url"))?;

    let header: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|_| AuthError::MalformedToken("token header is not a JSON object"))?;

    match header.get("kid") {
        Some(serde_json::Value::String(kid)) => Ok(kid.clone()),
        Some(_) => Err(AuthError::MalformedToken(
            "token key id (kid) must be a string",
        )),
        None => Err(AuthError::MalformedToken(
            "missing key id (kid) in token header",
        )),
    }
}
