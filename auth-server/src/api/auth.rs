use crate::errors::{ApiError, OAuthErrorBody};
use crate::openapi::AUTH_TAG;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use log::info;
use oauth_engine::credentials::{register_user, NewUser};
use oauth_engine::validator::bearer_token;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisteredUser {
    pub id: String,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Register an end user
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = RegisteredUser),
        (status = 400, description = "Missing fields", body = OAuthErrorBody),
        (status = 409, description = "Email or username already taken", body = OAuthErrorBody)
    ),
    tag = AUTH_TAG
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisteredUser>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::invalid_request(e.body_text()))?;
    let user = register_user(
        state.store(),
        state.engine.password_hasher(),
        NewUser {
            email: request.email,
            username: request.username,
            name: request.name,
            password: request.password,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisteredUser {
            id: user.id,
            email: user.email,
            username: user.username,
        }),
    ))
}

/// Revoke the access token presented in the `Authorization` header
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Token revoked", body = MessageResponse),
        (status = 400, description = "No bearer token supplied", body = OAuthErrorBody)
    ),
    security(("bearer" = [])),
    tag = AUTH_TAG
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let access_token = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| ApiError::invalid_request("missing access token"))?;

    // Unknown tokens are treated as already logged out
    if state.engine.revoke(access_token).await? {
        info!("User logged out");
    }

    Ok(Json(MessageResponse {
        message: "logout successful".to_string(),
    }))
}

pub(super) fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(register))
        .routes(routes!(logout))
}
