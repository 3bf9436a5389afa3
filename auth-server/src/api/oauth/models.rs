//! OAuth 2.0 request/response structures

use oauth_engine::{AuthorizeRequest, Introspection, IssuedToken, TokenRequest};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Authorization request, sent as query parameters (GET) or a form (POST)
#[derive(Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthorizeParams {
    /// `code` or `token`
    pub response_type: Option<String>,
    /// Client identifier
    pub client_id: Option<String>,
    /// Must match a registered redirect URI of the client
    pub redirect_uri: Option<String>,
    /// Requested scopes (space-separated)
    pub scope: Option<String>,
    /// Opaque value echoed back to the client
    pub state: Option<String>,
    /// PKCE code challenge
    pub code_challenge: Option<String>,
    /// PKCE code challenge method (`S256` or `plain`)
    pub code_challenge_method: Option<String>,
    /// Shared secret of the login gateway
    pub provision_key: Option<String>,
    /// End user already authenticated by the gateway
    pub authenticated_userid: Option<String>,
}

impl From<AuthorizeParams> for AuthorizeRequest {
    fn from(params: AuthorizeParams) -> Self {
        Self {
            response_type: params.response_type,
            client_id: params.client_id,
            redirect_uri: params.redirect_uri,
            scope: params.scope,
            state: params.state,
            code_challenge: params.code_challenge,
            code_challenge_method: params.code_challenge_method,
            provision_key: params.provision_key,
            authenticated_userid: params.authenticated_userid,
        }
    }
}

/// Token request body (form or JSON)
#[derive(Default, Deserialize, ToSchema)]
pub struct TokenForm {
    /// `authorization_code`, `client_credentials`, `password` or `refresh_token`
    #[serde(default)]
    pub grant_type: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl TokenForm {
    pub fn into_request(self, basic_auth: Option<(String, String)>) -> TokenRequest {
        TokenRequest {
            grant_type: self.grant_type,
            client_id: self.client_id,
            client_secret: self.client_secret,
            basic_auth,
            code: self.code,
            redirect_uri: self.redirect_uri,
            code_verifier: self.code_verifier,
            refresh_token: self.refresh_token,
            scope: self.scope,
            username: self.username,
            email: self.email,
            password: self.password,
        }
    }
}

/// Successful token response (RFC 6749 Section 5.1)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always `bearer`
    pub token_type: String,
    /// Seconds until the access token expires
    pub expires_in: i64,
    /// Access token expiry, seconds since the epoch
    pub access_token_expiration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Refresh token expiry, seconds since the epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_expiration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        let token = issued.token;
        Self {
            access_token: token.access_token,
            token_type: "bearer".to_string(),
            expires_in: issued.expires_in,
            access_token_expiration: token.access_expires_at.timestamp(),
            refresh_token_expiration: token
                .refresh_token
                .as_ref()
                .and(token.refresh_expires_at)
                .map(|at| at.timestamp()),
            refresh_token: token.refresh_token,
            scope: Some(token.scope).filter(|s| !s.is_empty()),
        }
    }
}

/// Token introspection request (RFC 7662 Section 2.1)
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct IntrospectRequest {
    #[serde(default)]
    pub token: String,
}

/// Token introspection response
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct IntrospectResponse {
    pub active: bool,
    /// Set while the access token is within the refresh window or already expired
    /// with a usable refresh token
    pub should_refresh: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl From<Introspection> for IntrospectResponse {
    fn from(result: Introspection) -> Self {
        Self {
            active: result.active,
            should_refresh: result.should_refresh,
            username: result.username,
            email: result.email,
            client_id: result.client_id,
            refresh_token: result.refresh_token,
            scope: result.scope,
            exp: result.exp,
        }
    }
}
