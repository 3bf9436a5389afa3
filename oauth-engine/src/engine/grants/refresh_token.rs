use async_trait::async_trait;
use log::{debug, warn};

use super::{GrantHandler, required};
use crate::engine::{EngineCore, TokenRequest};
use crate::error::GrantError;
use crate::models::Token;
use crate::scope;
use crate::store::Store;

/// Refresh token grant with rotation (RFC 6749 Section 6).
///
/// The old row is replaced atomically, so a refresh token works at most once
/// unless `reuse_refresh_token` keeps its value on the replacement.
pub struct RefreshTokenGrant;

#[async_trait]
impl<S: Store> GrantHandler<S> for RefreshTokenGrant {
    fn grant_type(&self) -> &'static str {
        "refresh_token"
    }

    async fn handle(
        &self,
        core: &EngineCore<S>,
        request: &TokenRequest,
    ) -> Result<Token, GrantError> {
        let credential = core.authenticate_client(request).await?;
        let refresh_value = required(&request.refresh_token, "refresh_token")?;

        let Some(old) = core
            .store()
            .find_token_by_refresh_token(refresh_value, &credential.id)
            .await?
        else {
            debug!("Unknown refresh token for client '{}'", credential.client_id);
            return Err(GrantError::InvalidGrant("invalid refresh token".into()));
        };
        if old.is_refresh_expired(core.now()) {
            return Err(GrantError::InvalidGrant("refresh token expired".into()));
        }

        let scope = match request.scope.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                let requested = scope::parse(Some(raw))?;
                if !scope::is_subset(&requested, &old.scope) {
                    return Err(GrantError::InvalidScope(
                        "requested scope exceeds the original grant".into(),
                    ));
                }
                scope::join(&requested)
            }
            _ => old.scope.clone(),
        };

        let replacement = if core.settings().reuse_refresh_token {
            let mut token = core.mint_token(&credential.id, old.user_id.clone(), scope, false);
            token.refresh_token = old.refresh_token.clone();
            token.refresh_expires_at = old.refresh_expires_at;
            if let Some(refresh_expires_at) = token.refresh_expires_at {
                token.access_expires_at = token.access_expires_at.min(refresh_expires_at);
            }
            token
        } else {
            core.mint_token(&credential.id, old.user_id.clone(), scope, true)
        };

        if !core.store().rotate_token(&old, replacement.clone()).await? {
            warn!(
                "Refresh token of client '{}' was rotated concurrently",
                credential.client_id
            );
            return Err(GrantError::InvalidGrant("invalid refresh token".into()));
        }
        Ok(replacement)
    }
}
