//! Verification-side key discovery.
//!
//! The authenticator asks a [`PublicKeyResolver`] for the public key of the
//! `kid` found in the token header. [`RegistryResolver`] verifies with the
//! same key set used for signing; the other resolvers let verification keys
//! live in a different trust domain (a static file set, a key-distribution
//! service, ...).

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey};
use parking_lot::RwLock;

use super::error::{AuthError, ResolveError};
use super::keys::{KeyRegistry, decoding_key_from_pem};

/// Resolve the public verification key for a key id.
///
/// Implementations may perform I/O; a resolver backed by a remote service is
/// responsible for its own timeout (see [`TimeoutResolver`]).
#[async_trait]
pub trait PublicKeyResolver: Send + Sync {
    async fn resolve(&self, kid: &str) -> Result<DecodingKey, ResolveError>;
}

/// Static, in-process resolver: a concurrent map from kid to public key.
#[derive(Default)]
pub struct MemoryKeyResolver {
    keys: RwLock<HashMap<String, DecodingKey>>,
}

impl fmt::Debug for MemoryKeyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryKeyResolver")
            .field("kids", &self.keys.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MemoryKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_key(&self, kid: impl Into<String>, key: DecodingKey) {
        self.keys.write().insert(kid.into(), key);
    }

    pub fn add_pem(
        &self,
        kid: impl Into<String>,
        algorithm: Algorithm,
        pem: &[u8],
    ) -> Result<(), AuthError> {
        let key = decoding_key_from_pem(algorithm, pem)?;
        self.add_key(kid, key);
        Ok(())
    }

    pub fn remove_key(&self, kid: &str) {
        self.keys.write().remove(kid);
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

#[async_trait]
impl PublicKeyResolver for MemoryKeyResolver {
    async fn resolve(&self, kid: &str) -> Result<DecodingKey, ResolveError> {
        self.keys
            .read()
            .get(kid)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(kid.to_string()))
    }
}

/// Resolves through the public halves stored in a [`KeyRegistry`].
///
/// Signing and verification share one key set: once a kid is removed from
/// the registry, tokens signed with it no longer verify.
#[derive(Debug, Clone)]
pub struct RegistryResolver {
    keys: KeyRegistry,
}

impl RegistryResolver {
    pub fn new(keys: KeyRegistry) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl PublicKeyResolver for RegistryResolver {
    async fn resolve(&self, kid: &str) -> Result<DecodingKey, ResolveError> {
        self.keys
            .get(kid)
            .and_then(|key| key.public_key().cloned())
            .ok_or_else(|| ResolveError::NotFound(kid.to_string()))
    }
}

/// Adapts a plain lookup function into a resolver.
pub struct FnResolver<F>(pub F);

#[async_trait]
impl<F> PublicKeyResolver for FnResolver<F>
where
    F: Fn(&str) -> Result<DecodingKey, ResolveError> + Send + Sync,
{
    async fn resolve(&self, kid: &str) -> Result<DecodingKey, ResolveError> {
        (self.0)(kid)
    }
}

/// Bounds every lookup of the wrapped resolver.
pub struct TimeoutResolver<R> {
    inner: R,
    timeout: Duration,
}

impl<R> TimeoutResolver<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl<R: PublicKeyResolver> PublicKeyResolver for TimeoutResolver<R> {
    async fn resolve(&self, kid: &str) -> Result<DecodingKey, ResolveError> {
        match tokio::time::timeout(self.timeout, self.inner.resolve(kid)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    kid = %kid,
                    timeout = ?self.timeout,
                    "public key lookup timed out"
                );
                Err(ResolveError::Timeout)
            }
        }
    }
}
