/*
 * Responsibility
 * - Errors that stop the service from starting (config, key material)
 * - Request-time errors live in `web::WebError`
 */
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::services::auth::AuthError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("reading keys from {dir}")]
    ReadKeys {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no signing keys found in {0}")]
    NoKeys(PathBuf),

    #[error("loading key {kid}")]
    LoadKey {
        kid: String,
        #[source]
        source: AuthError,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),
}
