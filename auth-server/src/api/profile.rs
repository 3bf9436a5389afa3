use crate::errors::OAuthErrorBody;
use crate::openapi::PROFILE_TAG;
use crate::state::AppState;
use axum::{Extension, Json};
use oauth_engine::AuthContext;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProfileResponse {
    /// `null` for machine tokens
    pub user_id: Option<String>,
    pub client_id: String,
    pub scope: String,
    pub message: String,
}

/// Example resource protected by a bearer token
#[utoipa::path(
    get,
    path = "/api/v1/profile",
    responses(
        (status = 200, description = "Identity behind the access token", body = ProfileResponse),
        (status = 401, description = "Missing, invalid or expired token", body = OAuthErrorBody)
    ),
    security(("bearer" = [])),
    tag = PROFILE_TAG
)]
pub async fn profile(Extension(context): Extension<AuthContext>) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        user_id: context.user_id,
        client_id: context.client_id,
        scope: context.scope,
        message: "This is a protected resource".to_string(),
    })
}

pub(super) fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(profile))
}
