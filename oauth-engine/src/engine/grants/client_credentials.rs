use async_trait::async_trait;

use super::GrantHandler;
use crate::engine::{EngineCore, TokenRequest};
use crate::error::GrantError;
use crate::models::Token;
use crate::scope;
use crate::store::Store;

/// Machine-to-machine grant (RFC 6749 Section 4.4).
/// Tokens carry no user and no refresh token.
pub struct ClientCredentialsGrant;

#[async_trait]
impl<S: Store> GrantHandler<S> for ClientCredentialsGrant {
    fn grant_type(&self) -> &'static str {
        "client_credentials"
    }

    async fn handle(
        &self,
        core: &EngineCore<S>,
        request: &TokenRequest,
    ) -> Result<Token, GrantError> {
        if !core.settings().enable_client_credentials {
            return Err(GrantError::GrantTypeDisabled("client credentials grant"));
        }
        let credential = core.authenticate_client(request).await?;
        let scopes = scope::parse(request.scope.as_deref())?;
        core.issue_token(&credential, None, scope::join(&scopes), false)
            .await
    }
}
