/*
 * Responsibility
 * - v1 URL structure
 * - Which routes need a bearer token and which roles
 */
use std::sync::Arc;

use axum::routing::MethodFilter;

use crate::api::v1::handlers::check;
use crate::middleware::{Authenticate, Authorize};
use crate::services::auth::ROLE_ADMIN;
use crate::state::AppState;
use crate::web::{App, Middleware};

pub fn routes(app: App, state: &AppState) -> App {
    let authenticate: Arc<dyn Middleware> = Arc::new(Authenticate::new(Arc::clone(&state.auth)));
    let admin_only: Arc<dyn Middleware> =
        Arc::new(Authorize::new([ROLE_ADMIN], state.forbidden_log_level));

    app.handle(
        MethodFilter::GET,
        "/v1/liveness",
        check::liveness(&state.build),
        vec![],
    )
    .handle(
        MethodFilter::GET,
        "/v1/readiness",
        check::readiness(&state.build),
        vec![authenticate, admin_only],
    )
}
