use async_trait::async_trait;
use log::{debug, warn};

use super::{GrantHandler, required};
use crate::engine::{EngineCore, TokenRequest};
use crate::error::GrantError;
use crate::models::Token;
use crate::pkce;
use crate::scope;
use crate::store::Store;

const INVALID_CODE: &str = "authorization code is invalid or already used";

/// Authorization code redemption (RFC 6749 Section 4.1.3).
///
/// A code is burned by the first attempt that gets past the validity check, even
/// if the redirect URI or PKCE verification fails afterwards.
pub struct AuthorizationCodeGrant;

#[async_trait]
impl<S: Store> GrantHandler<S> for AuthorizationCodeGrant {
    fn grant_type(&self) -> &'static str {
        "authorization_code"
    }

    async fn handle(
        &self,
        core: &EngineCore<S>,
        request: &TokenRequest,
    ) -> Result<Token, GrantError> {
        if !core.settings().enable_authorization_code {
            return Err(GrantError::GrantTypeDisabled("authorization code grant"));
        }

        let credential = core.authenticate_client(request).await?;
        let code_value = required(&request.code, "code")?;

        let Some(code) = core
            .store()
            .find_authorization_code(code_value, &credential.client_id)
            .await?
        else {
            debug!("Unknown authorization code for client '{}'", credential.client_id);
            return Err(GrantError::InvalidGrant(INVALID_CODE.into()));
        };
        if !code.is_valid(core.now()) {
            return Err(GrantError::InvalidGrant(INVALID_CODE.into()));
        }
        if !core.store().mark_authorization_code_used(code_value).await? {
            warn!(
                "Concurrent redemption of an authorization code by client '{}'",
                credential.client_id
            );
            return Err(GrantError::InvalidGrant(INVALID_CODE.into()));
        }

        if request.redirect_uri.as_deref() != Some(code.redirect_uri.as_str()) {
            return Err(GrantError::InvalidGrant("redirect_uri mismatch".into()));
        }

        if let Some(challenge) = code.code_challenge.as_deref() {
            let verifier = request
                .code_verifier
                .as_deref()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| GrantError::InvalidGrant("code_verifier is required".into()))?;
            let method = code.code_challenge_method.unwrap_or_default();
            if !pkce::verify(verifier, challenge, method) {
                return Err(GrantError::InvalidGrant("invalid code_verifier".into()));
            }
        }

        core.issue_token(
            &credential,
            Some(code.user_id.clone()),
            scope::join(&code.scopes),
            true,
        )
        .await
    }
}
