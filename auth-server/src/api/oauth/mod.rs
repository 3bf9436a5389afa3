//! OAuth 2.0 Authorization Server endpoints
//!
//! ## Supported flows
//! - Authorization Code Grant with optional PKCE (RFC 6749 Section 4.1, RFC 7636)
//! - Implicit Grant (RFC 6749 Section 4.2), disabled by default
//! - Resource Owner Password Credentials Grant (RFC 6749 Section 4.3), disabled by default
//! - Client Credentials Grant (RFC 6749 Section 4.4)
//! - Refresh Token rotation (RFC 6749 Section 6)
//! - Token Introspection (RFC 7662)
//!
//! The authorization endpoint does not render a login page. A trusted gateway
//! authenticates the end user and calls it with the provision key.

pub mod extract;
pub mod handlers;
pub mod models;

use crate::state::AppState;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Creates OAuth 2.0 routes
pub fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::authorize, handlers::authorize_form))
        .routes(routes!(handlers::token))
        .routes(routes!(handlers::introspect))
}
