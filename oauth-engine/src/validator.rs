//! Bearer token authentication and introspection

use chrono::TimeDelta;
use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{AuthError, StoreError};
use crate::store::Store;

/// Identity resolved from a valid access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub token_id: String,
    pub client_id: String,
    /// `None` for machine tokens
    pub user_id: Option<String>,
    pub scope: String,
}

/// Introspection result (RFC 7662 shaped)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Introspection {
    pub active: bool,
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
    /// Access token expiry, seconds since the epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Extract the token from an `Authorization: Bearer <token>` value.
/// The scheme is matched case-insensitively.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() && !token.contains(' '))
        .then_some(token)
}

/// Checks access tokens against the store
pub struct TokenValidator<S: Store> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    refresh_window: TimeDelta,
}

impl<S: Store> Clone for TokenValidator<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            refresh_window: self.refresh_window,
        }
    }
}

impl<S: Store> TokenValidator<S> {
    /// `refresh_window` is in seconds
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, refresh_window: u64) -> Self {
        let refresh_window = i64::try_from(refresh_window)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        Self {
            store,
            clock,
            refresh_window,
        }
    }

    /// Validate the raw `Authorization` header of a request
    pub async fn authenticate(&self, header: Option<&str>) -> Result<AuthContext, AuthError> {
        let header = header.ok_or(AuthError::MissingHeader)?;
        let access_token = bearer_token(header).ok_or(AuthError::MalformedHeader)?;

        let token = self
            .store
            .find_token_by_access_token(access_token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let now = self.clock.now();
        if token.is_access_expired(now) {
            return Err(AuthError::Expired {
                refreshable: !token.is_refresh_expired(now),
            });
        }

        let Some(credential) = self.store.find_credential_by_id(&token.credential_id).await?
        else {
            warn!("Token {} references a missing credential", token.id);
            return Err(AuthError::InvalidToken);
        };

        Ok(AuthContext {
            token_id: token.id,
            client_id: credential.client_id,
            user_id: token.user_id,
            scope: token.scope,
        })
    }

    /// Report the state of an access token without failing on inactive ones
    pub async fn introspect(&self, access_token: &str) -> Result<Introspection, StoreError> {
        let Some(token) = self.store.find_token_by_access_token(access_token).await? else {
            debug!("Introspected token not found");
            return Ok(Introspection::default());
        };

        let now = self.clock.now();
        if token.is_access_expired(now) {
            return Ok(Introspection {
                active: false,
                should_refresh: !token.is_refresh_expired(now),
                ..Default::default()
            });
        }

        let client_id = self
            .store
            .find_credential_by_id(&token.credential_id)
            .await?
            .map(|c| c.client_id);

        let (username, email) = match token.user_id.as_deref() {
            Some(user_id) => match self.store.find_user_by_id(user_id).await? {
                Some(user) => (Some(user.username), Some(user.email)),
                None => {
                    warn!("Token {} references a missing user", token.id);
                    (None, None)
                }
            },
            None => (None, None),
        };

        let window_start = token
            .access_expires_at
            .checked_sub_signed(self.refresh_window)
            .unwrap_or(token.access_expires_at);

        Ok(Introspection {
            active: true,
            should_refresh: now >= window_start,
            username,
            email,
            client_id,
            refresh_token: token.refresh_token,
            scope: Some(token.scope),
            exp: Some(token.access_expires_at.timestamp()),
        })
    }
}
