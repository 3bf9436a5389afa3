//! OAuth 2.0 endpoint handlers

use super::extract::{basic_credentials, FormOrJson};
use super::models::{AuthorizeParams, IntrospectRequest, IntrospectResponse, TokenForm, TokenResponse};
use crate::errors::{ApiError, OAuthErrorBody};
use crate::headers::presets;
use crate::openapi::OAUTH_TAG;
use crate::state::AppState;
use axum::extract::{Form, Query, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{debug, info};
use oauth_engine::AuthorizeRejection;
use url::Url;

/// OAuth 2.0 Authorization endpoint (RFC 6749 Section 4.1.1 and 4.2.1)
///
/// Called by the login gateway once the end user is authenticated.
#[utoipa::path(
    get,
    path = "/oauth2/authorize",
    params(AuthorizeParams),
    responses(
        (status = 302, description = "Redirect to the client with a code, a token or an error"),
        (status = 400, description = "Invalid client or redirect URI", body = OAuthErrorBody),
        (status = 401, description = "Unknown client", body = OAuthErrorBody),
        (status = 403, description = "Invalid provision key", body = OAuthErrorBody)
    ),
    tag = OAUTH_TAG
)]
pub async fn authorize(
    State(state): State<AppState>,
    Query(params): Query<AuthorizeParams>,
) -> Response {
    run_authorize(&state, params).await
}

/// OAuth 2.0 Authorization endpoint, form variant
#[utoipa::path(
    post,
    path = "/oauth2/authorize",
    request_body(content = AuthorizeParams, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 302, description = "Redirect to the client with a code, a token or an error"),
        (status = 400, description = "Invalid client or redirect URI", body = OAuthErrorBody),
        (status = 401, description = "Unknown client", body = OAuthErrorBody),
        (status = 403, description = "Invalid provision key", body = OAuthErrorBody)
    ),
    tag = OAUTH_TAG
)]
pub async fn authorize_form(
    State(state): State<AppState>,
    Form(params): Form<AuthorizeParams>,
) -> Response {
    run_authorize(&state, params).await
}

async fn run_authorize(state: &AppState, params: AuthorizeParams) -> Response {
    debug!(
        "Authorization request from client_id: {}",
        params.client_id.as_deref().unwrap_or("-")
    );
    match state.engine.authorize(params.into()).await {
        Ok(location) => found(location),
        Err(AuthorizeRejection::Redirect { location, error }) => {
            info!("Authorization denied, redirecting with error: {}", error.code());
            found(location)
        }
        Err(AuthorizeRejection::Direct(error)) => ApiError::from(error).into_response(),
    }
}

fn found(location: Url) -> Response {
    presets::uncached((StatusCode::FOUND, [(LOCATION, location.to_string())]))
}

/// OAuth 2.0 Token endpoint (RFC 6749 Section 3.2)
///
/// Client credentials are read from the body or from an `Authorization: Basic` header.
#[utoipa::path(
    post,
    path = "/oauth2/token",
    request_body(content = TokenForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "Invalid request or grant", body = OAuthErrorBody),
        (status = 401, description = "Client authentication failed", body = OAuthErrorBody)
    ),
    tag = OAUTH_TAG
)]
pub async fn token(
    State(state): State<AppState>,
    headers: HeaderMap,
    FormOrJson(form): FormOrJson<TokenForm>,
) -> Response {
    let request = form.into_request(basic_credentials(&headers));
    match state.engine.token(request).await {
        Ok(issued) => presets::uncached(Json(TokenResponse::from(issued))),
        Err(error) => presets::uncached(ApiError::from(error)),
    }
}

/// OAuth 2.0 Token introspection endpoint (RFC 7662)
///
/// Unknown and expired tokens are reported as `active: false`.
#[utoipa::path(
    post,
    path = "/oauth2/introspect",
    request_body(content = IntrospectRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Introspection result", body = IntrospectResponse),
        (status = 400, description = "Missing token", body = OAuthErrorBody)
    ),
    tag = OAUTH_TAG
)]
pub async fn introspect(
    State(state): State<AppState>,
    FormOrJson(request): FormOrJson<IntrospectRequest>,
) -> Result<Response, ApiError> {
    let token = request.token.trim();
    if token.is_empty() {
        return Err(ApiError::invalid_request("token is required"));
    }
    let result = state.validator.introspect(token).await?;
    Ok(presets::uncached(Json(IntrospectResponse::from(result))))
}
