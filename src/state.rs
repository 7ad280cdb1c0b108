/*
 * Responsibility
 * - Shared context the routes are built from
 * - Clone is cheap (Arc inside)
 */
use std::sync::Arc;

use crate::middleware::ForbiddenLogLevel;
use crate::services::auth::Authenticator;

#[derive(Clone, Debug)]
pub struct AppState {
    pub auth: Arc<Authenticator>,
    pub build: String,
    pub forbidden_log_level: ForbiddenLogLevel,
}

impl AppState {
    pub fn new(
        auth: Arc<Authenticator>,
        build: impl Into<String>,
        forbidden_log_level: ForbiddenLogLevel,
    ) -> Self {
        Self {
            auth,
            build: build.into(),
            forbidden_log_level,
        }
    }
}
