//! Authorize and token endpoint state machine

pub mod authorize;
pub mod builder;
pub mod grants;

use chrono::{DateTime, Utc};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::clock::{Clock, expires_after, new_id, random_token};
use crate::error::GrantError;
use crate::models::{Credential, Token};
use crate::secret::PasswordHasher;
use crate::settings::EngineSettings;
use crate::store::Store;
use crate::validator::TokenValidator;

pub use authorize::{AuthorizeRejection, AuthorizeRequest};
pub use builder::GrantEngineBuilder;
pub use grants::GrantHandler;

/// Token endpoint input after the transport layer has decoded it
#[derive(Clone, Default)]
pub struct TokenRequest {
    pub grant_type: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// `(client_id, client_secret)` from an `Authorization: Basic` header
    pub basic_auth: Option<(String, String)>,
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl TokenRequest {
    /// Body credentials are used when both are present, Basic auth otherwise
    pub fn client_credentials(&self) -> (Option<&str>, Option<&str>) {
        let id = self.client_id.as_deref().filter(|s| !s.is_empty());
        let secret = self.client_secret.as_deref().filter(|s| !s.is_empty());
        match (id, secret, &self.basic_auth) {
            (Some(_), Some(_), _) | (_, _, None) => (id, secret),
            (_, _, Some((basic_id, basic_secret))) => {
                (Some(basic_id.as_str()), Some(basic_secret.as_str()))
            }
        }
    }
}

/// Result of a successful token request
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: Token,
    /// Seconds until the access token expires
    pub expires_in: i64,
}

/// Collaborators shared by every grant handler
pub struct EngineCore<S: Store> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    hasher: Arc<dyn PasswordHasher>,
    settings: EngineSettings,
}

impl<S: Store> EngineCore<S> {
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn password_hasher(&self) -> &dyn PasswordHasher {
        self.hasher.as_ref()
    }

    /// Resolve and verify the client presenting this request
    pub async fn authenticate_client(
        &self,
        request: &TokenRequest,
    ) -> Result<Credential, GrantError> {
        let (client_id, client_secret) = request.client_credentials();
        let Some(client_id) = client_id else {
            return Err(GrantError::InvalidClient("client_id is required".into()));
        };

        let Some(credential) = self.store.find_credential_by_client_id(client_id).await? else {
            warn!("Unknown client '{}'", client_id);
            return Err(GrantError::InvalidClient("invalid client".into()));
        };

        match client_secret {
            Some(secret) if credential.verify_secret(secret) => Ok(credential),
            _ => {
                warn!("Client authentication failed for '{}'", client_id);
                Err(GrantError::InvalidClient(
                    "invalid client credentials".into(),
                ))
            }
        }
    }

    /// Build a token without storing it.
    ///
    /// A refresh token is attached only when `with_refresh` is set and refresh
    /// tokens are enabled. Refresh expiry never precedes access expiry.
    pub fn mint_token(
        &self,
        credential_id: &str,
        user_id: Option<String>,
        scope: String,
        with_refresh: bool,
    ) -> Token {
        let now = self.now();
        let access_expires_at = expires_after(now, self.settings.access_token_ttl);
        let (refresh_token, refresh_expires_at) =
            if with_refresh && self.settings.issues_refresh_tokens() {
                let expires_at =
                    expires_after(now, self.settings.refresh_token_ttl).max(access_expires_at);
                (Some(random_token()), Some(expires_at))
            } else {
                (None, None)
            };

        Token {
            id: new_id(),
            access_token: random_token(),
            refresh_token,
            access_expires_at,
            refresh_expires_at,
            scope,
            user_id,
            credential_id: credential_id.to_string(),
            created_at: now,
        }
    }

    /// Mint and store a token
    pub async fn issue_token(
        &self,
        credential: &Credential,
        user_id: Option<String>,
        scope: String,
        with_refresh: bool,
    ) -> Result<Token, GrantError> {
        let token = self.mint_token(&credential.id, user_id, scope, with_refresh);
        self.store.insert_token(token.clone()).await?;
        Ok(token)
    }
}

/// Entry point for the authorize and token endpoints.
///
/// Token requests are dispatched by `grant_type` to a registered [`GrantHandler`].
/// The four standard grants are registered by [`GrantEngineBuilder::build`];
/// [`GrantEngine::register_grant`] adds or replaces one.
pub struct GrantEngine<S: Store> {
    core: EngineCore<S>,
    grants: HashMap<&'static str, Arc<dyn GrantHandler<S>>>,
}

impl<S: Store> GrantEngine<S> {
    pub fn builder(store: Arc<S>) -> GrantEngineBuilder<S> {
        GrantEngineBuilder::new(store)
    }

    pub fn register_grant<H: GrantHandler<S> + 'static>(&mut self, handler: H) {
        self.grants.insert(handler.grant_type(), Arc::new(handler));
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.core.settings
    }

    pub fn store(&self) -> &Arc<S> {
        &self.core.store
    }

    pub fn password_hasher(&self) -> &dyn PasswordHasher {
        self.core.password_hasher()
    }

    /// Validator sharing this engine's store, clock and refresh window
    pub fn validator(&self) -> TokenValidator<S> {
        TokenValidator::new(
            self.core.store.clone(),
            self.core.clock.clone(),
            self.core.settings.refresh_window,
        )
    }

    /// Handle a token endpoint request
    pub async fn token(&self, request: TokenRequest) -> Result<IssuedToken, GrantError> {
        let grant_type = request.grant_type.trim();
        if grant_type.is_empty() {
            return Err(GrantError::InvalidRequest("grant_type is required".into()));
        }
        let Some(handler) = self.grants.get(grant_type) else {
            warn!("Unsupported grant type '{}'", grant_type);
            return Err(GrantError::UnsupportedGrantType(grant_type.to_string()));
        };

        match handler.handle(&self.core, &request).await {
            Ok(token) => {
                info!(
                    "Issued token via {} for credential {} (user: {})",
                    grant_type,
                    token.credential_id,
                    token.user_id.as_deref().unwrap_or("-")
                );
                let expires_in = (token.access_expires_at - self.core.now()).num_seconds();
                Ok(IssuedToken { token, expires_in })
            }
            Err(e) => {
                warn!("{} grant rejected: {} ({})", grant_type, e.code(), e);
                Err(e)
            }
        }
    }

    /// Delete the token behind an access token value. Returns whether it existed.
    pub async fn revoke(&self, access_token: &str) -> Result<bool, GrantError> {
        let deleted = self.core.store.delete_token(access_token).await?;
        if deleted {
            info!("Revoked token");
        }
        Ok(deleted)
    }
}
