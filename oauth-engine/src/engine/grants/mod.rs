//! Token endpoint grant handlers, one per `grant_type`

mod authorization_code;
mod client_credentials;
mod password;
mod refresh_token;

use async_trait::async_trait;

use super::{EngineCore, TokenRequest};
use crate::error::GrantError;
use crate::models::Token;
use crate::store::Store;

pub use authorization_code::AuthorizationCodeGrant;
pub use client_credentials::ClientCredentialsGrant;
pub use password::PasswordGrant;
pub use refresh_token::RefreshTokenGrant;

/// Strategy for one `grant_type` of the token endpoint
#[async_trait]
pub trait GrantHandler<S: Store>: Send + Sync {
    /// Value of `grant_type` this handler is registered under
    fn grant_type(&self) -> &'static str;

    /// Validate the request and return the stored token
    async fn handle(&self, core: &EngineCore<S>, request: &TokenRequest)
    -> Result<Token, GrantError>;
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, GrantError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GrantError::InvalidRequest(format!("{name} is required")))
}
