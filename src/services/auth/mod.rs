//! Token authentication: claims, signing keys, public-key resolution and
//! the [`Authenticator`] that ties them together.

pub mod authenticator;
pub mod claims;
pub mod error;
pub mod keys;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testutil;

pub use authenticator::{Authenticator, AuthenticatorOptions};
pub use claims::{Claims, ROLE_ADMIN, ROLE_USER};
pub use error::{AuthError, ResolveError};
pub use keys::{KeyRegistry, PrivateKey};
pub use resolver::{
    FnResolver, MemoryKeyResolver, PublicKeyResolver, RegistryResolver, TimeoutResolver,
};
