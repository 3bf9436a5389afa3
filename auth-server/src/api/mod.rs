mod auth;
mod authn_middleware;
pub(crate) mod health;
pub(crate) mod oauth;
mod profile;

use crate::api::authn_middleware::authentication_middleware;
use crate::state::AppState;
use axum::middleware;
use utoipa_axum::router::OpenApiRouter;

/// Combines all API routes into a single router
pub(super) fn router(state: &AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(health::router())
        .merge(oauth::router())
        .merge(auth::router())
        .merge(protected_routes(state))
}

/// Creates a router for resources that require a bearer access token
fn protected_routes(state: &AppState) -> OpenApiRouter<AppState> {
    profile::router().layer(middleware::from_fn_with_state(
        state.clone(),
        authentication_middleware,
    ))
}
