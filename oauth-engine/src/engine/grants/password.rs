use async_trait::async_trait;
use log::debug;

use super::{GrantHandler, required};
use crate::engine::{EngineCore, TokenRequest};
use crate::error::GrantError;
use crate::models::Token;
use crate::scope;
use crate::store::Store;

/// Resource owner password credentials grant (RFC 6749 Section 4.3).
///
/// The user is identified by `email`, or by `username` when no email is given.
/// User checks run before client authentication.
pub struct PasswordGrant;

#[async_trait]
impl<S: Store> GrantHandler<S> for PasswordGrant {
    fn grant_type(&self) -> &'static str {
        "password"
    }

    async fn handle(
        &self,
        core: &EngineCore<S>,
        request: &TokenRequest,
    ) -> Result<Token, GrantError> {
        if !core.settings().enable_password_grant {
            return Err(GrantError::GrantTypeDisabled("password grant"));
        }

        let login = required(&request.email, "email")
            .or_else(|_| required(&request.username, "username"))
            .map_err(|_| GrantError::InvalidRequest("email and password are required".into()))?;
        let password = required(&request.password, "password")
            .map_err(|_| GrantError::InvalidRequest("email and password are required".into()))?;

        let user = match core.store().find_user_by_email(login).await? {
            Some(user) => Some(user),
            None => core.store().find_user_by_username(login).await?,
        };
        let Some(user) = user else {
            debug!("Password grant for unknown login");
            return Err(GrantError::InvalidGrant("invalid credentials".into()));
        };

        if !core
            .password_hasher()
            .verify(password, &user.password_hash)
            .await?
        {
            debug!("Password mismatch for user {}", user.id);
            return Err(GrantError::InvalidGrant("invalid credentials".into()));
        }
        if !user.active {
            return Err(GrantError::InvalidGrant("user is inactive".into()));
        }

        let credential = core.authenticate_client(request).await?;
        let scopes = scope::parse(request.scope.as_deref())?;
        core.issue_token(&credential, Some(user.id), scope::join(&scopes), true)
            .await
    }
}
