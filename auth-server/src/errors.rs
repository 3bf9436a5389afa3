use axum::response::IntoResponse;
use axum::Json;
use http::header::WWW_AUTHENTICATE;
use http::{HeaderValue, StatusCode};
use log::error;
use oauth_engine::{AuthError, ErrorCode, GrantError, ProvisionError, StoreError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// OAuth 2.0 error body (RFC 6749 Section 5.2)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OAuthErrorBody {
    /// Error code, e.g. `invalid_grant`
    pub error: String,
    /// Human-readable error description
    pub error_description: String,
}

#[derive(Debug, Clone)]
pub struct ApiError {
    pub status_code: StatusCode,
    pub body: OAuthErrorBody,
    challenge: Option<&'static str>,
}

/// HTTP status for an OAuth error code
pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidClient => StatusCode::UNAUTHORIZED,
        ErrorCode::AccessDenied => StatusCode::FORBIDDEN,
        ErrorCode::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl ApiError {
    /// Create a new ApiError with an error code, description and status code
    pub fn new<S: ToString>(status_code: StatusCode, error: &str, description: S) -> Self {
        Self {
            status_code,
            body: OAuthErrorBody {
                error: error.to_string(),
                error_description: description.to_string(),
            },
            challenge: None,
        }
    }

    /// Create new Bad Request Error (400) with `invalid_request`
    pub fn invalid_request<S: ToString>(description: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", description)
    }

    /// Create new Internal Server Error (500). The cause is logged, not returned.
    pub fn internal<S: ToString>(cause: S) -> Self {
        error!("Internal error: {}", cause.to_string());
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::ServerError.as_str(),
            "internal server error",
        )
    }

    fn with_challenge(mut self, challenge: &'static str) -> Self {
        self.challenge = Some(challenge);
        self
    }
}

impl From<GrantError> for ApiError {
    fn from(err: GrantError) -> Self {
        let code = err.code();
        if code == ErrorCode::ServerError {
            error!("Grant request failed: {}", err);
        }
        let api_error = Self::new(status_for(code), code.as_str(), err.description());
        if code == ErrorCode::InvalidClient {
            api_error.with_challenge("Basic realm=\"oauth2\"")
        } else {
            api_error
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(e) => Self::internal(e),
            other => Self::new(StatusCode::UNAUTHORIZED, "invalid_token", other)
                .with_challenge("Bearer"),
        }
    }
}

impl From<ProvisionError> for ApiError {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::Conflict(msg) => Self::new(StatusCode::CONFLICT, "conflict", msg),
            ProvisionError::InvalidInput(msg) => Self::invalid_request(msg),
            other => Self::internal(other),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let mut response = (self.status_code, Json(self.body)).into_response();
        if let Some(challenge) = self.challenge {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorCode::InvalidClient), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(ErrorCode::AccessDenied), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(ErrorCode::ServerError),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_for(ErrorCode::InvalidGrant), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(ErrorCode::UnsupportedGrantType),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_grant_error_conversion() {
        let err = ApiError::from(GrantError::InvalidGrant("refresh token expired".into()));
        assert_eq!(err.status_code, StatusCode::BAD_REQUEST);
        assert_eq!(err.body.error, "invalid_grant");
        assert_eq!(err.body.error_description, "refresh token expired");

        let err = ApiError::from(GrantError::Store(StoreError::Backend(
            "connection refused".into(),
        )));
        assert_eq!(err.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.error_description, "internal server error");
    }

    #[test]
    fn test_invalid_client_carries_challenge() {
        let response =
            ApiError::from(GrantError::InvalidClient("invalid client".into())).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"oauth2\""
        );
    }

    #[test]
    fn test_auth_error_conversion() {
        let err = ApiError::from(AuthError::Expired { refreshable: true });
        assert_eq!(err.status_code, StatusCode::UNAUTHORIZED);
        assert_eq!(err.body.error, "invalid_token");
        assert_eq!(err.body.error_description, "token expired");
    }

    #[test]
    fn test_provision_error_conversion() {
        let err = ApiError::from(ProvisionError::Conflict("email already registered".into()));
        assert_eq!(err.status_code, StatusCode::CONFLICT);
        let err = ApiError::from(ProvisionError::InvalidInput("email is required".into()));
        assert_eq!(err.status_code, StatusCode::BAD_REQUEST);
    }
}
