//! RSA fixtures shared by the unit tests.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::Algorithm;

use super::authenticator::Authenticator;
use super::claims::Claims;
use super::keys::{KeyRegistry, PrivateKey, decoding_key_from_pem};
use super::resolver::MemoryKeyResolver;

pub const PRIMARY_KID: &str = "54bb2165-71e1-41a6-af3e-7da4a0e1e2c1";

pub const PRIMARY_PRIVATE_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/rsa_primary.pem"
));
pub const PRIMARY_PUBLIC_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/rsa_primary.pub.pem"
));
pub const SECONDARY_PRIVATE_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/rsa_secondary.pem"
));
pub const SECONDARY_PUBLIC_PEM: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/rsa_secondary.pub.pem"
));

/// RS256 authenticator with the primary key registered on both sides.
pub fn authenticator() -> (Authenticator, Arc<MemoryKeyResolver>) {
    let resolver = Arc::new(MemoryKeyResolver::new());
    resolver.add_key(
        PRIMARY_KID,
        decoding_key_from_pem(Algorithm::RS256, PRIMARY_PUBLIC_PEM.as_bytes()).unwrap(),
    );

    let keys = KeyRegistry::new();
    keys.add_key(
        PRIMARY_KID,
        PrivateKey::from_pem(Algorithm::RS256, PRIMARY_PRIVATE_PEM.as_bytes()).unwrap(),
    );

    let auth = Authenticator::new("RS256", resolver.clone(), keys).unwrap();
    (auth, resolver)
}

pub fn claims(roles: &[&str]) -> Claims {
    Claims::new(
        "service project",
        "5cf37266-3473-4006-984f-9325122678b7",
        "students",
        roles.iter().copied(),
        Duration::from_secs(3600),
    )
}
