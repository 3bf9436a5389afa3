use crate::errors::ApiError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use log::warn;
use oauth_engine::AuthError;

/// Requires a valid bearer access token and stores the resolved
/// [`oauth_engine::AuthContext`] in the request extensions.
pub(super) async fn authentication_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let header = match request.headers().get(http::header::AUTHORIZATION) {
        Some(value) => match value.to_str() {
            Ok(value) => Some(value.to_owned()),
            Err(e) => {
                warn!("Failed to parse Authorization header to string: {}", e);
                return ApiError::from(AuthError::MalformedHeader).into_response();
            }
        },
        None => None,
    };

    match state.validator.authenticate(header.as_deref()).await {
        Ok(context) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(e) => {
            warn!("Authentication failed: {}", e);
            ApiError::from(e).into_response()
        }
    }
}
