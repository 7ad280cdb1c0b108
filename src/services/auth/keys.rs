//! Private signing keys and the in-memory key registry.
//!
//! The registry maps a key id (`kid`) to the private key used for signing
//! and, when it is known, the matching public key.
//! It is shared by every in-flight request, so all access goes through a
//! reader-writer lock: validations and issuance only take the read side,
//! `add_key` / `remove_key` take the write side.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use josekit::jwk::alg::rsa::RsaKeyPair;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use parking_lot::RwLock;

use super::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyFamily {
    Rsa,
    Ec,
    Ed,
}

fn key_family(algorithm: Algorithm) -> Option<KeyFamily> {
    match algorithm {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => Some(KeyFamily::Rsa),
        Algorithm::ES256 | Algorithm::ES384 => Some(KeyFamily::Ec),
        Algorithm::EdDSA => Some(KeyFamily::Ed),
        _ => None,
    }
}

/// Parse an algorithm name, accepting only asymmetric schemes.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, AuthError> {
    let algorithm = Algorithm::from_str(name)
        .map_err(|_| AuthError::UnsupportedAlgorithm(name.to_string()))?;

    // HS* would let anyone holding the verification secret mint tokens.
    match key_family(algorithm) {
        Some(_) => Ok(algorithm),
        None => Err(AuthError::UnsupportedAlgorithm(name.to_string())),
    }
}

/// A private key able to sign tokens for one algorithm family, optionally
/// paired with its public half for verification.
///
/// Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct PrivateKey {
    encoding: EncodingKey,
    public: Option<DecodingKey>,
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("has_public", &self.public.is_some())
            .finish_non_exhaustive()
    }
}

impl PrivateKey {
    pub fn from_pem(algorithm: Algorithm, pem: &[u8]) -> Result<Self, AuthError> {
        let family = key_family(algorithm)
            .ok_or_else(|| AuthError::UnsupportedAlgorithm(format!("{algorithm:?}")))?;

        let encoding = match family {
            KeyFamily::Rsa => EncodingKey::from_rsa_pem(pem),
            KeyFamily::Ec => EncodingKey::from_ec_pem(pem),
            KeyFamily::Ed => EncodingKey::from_ed_pem(pem),
        }
        .map_err(|e| AuthError::InvalidKey(e.to_string()))?;

        Ok(Self {
            encoding,
            public: None,
        })
    }

    /// Parse a PEM private key and keep the public half derived from it.
    /// Only RSA keys can be derived.
    pub fn from_pem_with_public(algorithm: Algorithm, pem: &[u8]) -> Result<Self, AuthError> {
        let key = Self::from_pem(algorithm, pem)?;
        let public = derive_public_pem(pem)?;
        Ok(key.with_public(decoding_key_from_pem(algorithm, &public)?))
    }

    pub fn with_public(mut self, public: DecodingKey) -> Self {
        self.public = Some(public);
        self
    }

    pub fn public_key(&self) -> Option<&DecodingKey> {
        self.public.as_ref()
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }
}

/// Parse a PEM public key for the algorithm family.
pub fn decoding_key_from_pem(algorithm: Algorithm, pem: &[u8]) -> Result<DecodingKey, AuthError> {
    let family = key_family(algorithm)
        .ok_or_else(|| AuthError::UnsupportedAlgorithm(format!("{algorithm:?}")))?;

    match family {
        KeyFamily::Rsa => DecodingKey::from_rsa_pem(pem),
        KeyFamily::Ec => DecodingKey::from_ec_pem(pem),
        KeyFamily::Ed => DecodingKey::from_ed_pem(pem),
    }
    .map_err(|e| AuthError::InvalidKey(e.to_string()))
}

/// Derive the SPKI public key PEM from an RSA private key PEM.
pub fn derive_public_pem(private_pem: &[u8]) -> Result<Vec<u8>, AuthError> {
    let pair = RsaKeyPair::from_pem(private_pem).map_err(|e| AuthError::InvalidKey(e.to_string()))?;
    Ok(pair.to_pem_public_key())
}

/// Generate a fresh RSA keypair, returned as `(private_pem, public_pem)`.
pub fn generate_rsa_pem(bits: u32) -> Result<(Vec<u8>, Vec<u8>), AuthError> {
    let pair = RsaKeyPair::generate(bits).map_err(|e| AuthError::InvalidKey(e.to_string()))?;
    Ok((pair.to_pem_private_key(), pair.to_pem_public_key()))
}

/// Read every `*.pem` file in `dir` as `(kid, pem bytes)`; the file stem is the kid.
pub fn read_pem_dir(dir: &Path) -> std::io::Result<Vec<(String, Vec<u8>)>> {
    let mut out = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("pem") {
            continue;
        }
        let Some(kid) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        // `<kid>.pub.pem` files are public halves written next to the private keys.
        if kid.ends_with(".pub") {
            continue;
        }
        out.push((kid.to_string(), std::fs::read(&path)?));
    }

    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

/// Concurrent map from key id to private signing key.
///
/// Clones are handles onto the same map.
#[derive(Debug, Default, Clone)]
pub struct KeyRegistry {
    keys: Arc<RwLock<HashMap<String, Arc<PrivateKey>>>>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or overwrite) the private key for `kid`.
    pub fn add_key(&self, kid: impl Into<String>, key: PrivateKey) {
        self.keys.write().insert(kid.into(), Arc::new(key));
    }

    /// Drop the private key for `kid`; a no-op when absent.
    pub fn remove_key(&self, kid: &str) {
        self.keys.write().remove(kid);
    }

    pub fn get(&self, kid: &str) -> Option<Arc<PrivateKey>> {
        self.keys.read().get(kid).cloned()
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.keys.read().contains_key(kid)
    }

    pub fn kids(&self) -> Vec<String> {
        let mut kids: Vec<String> = self.keys.read().keys().cloned().collect();
        kids.sort();
        kids
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}
