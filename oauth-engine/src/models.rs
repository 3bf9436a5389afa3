//! Records held by the store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pkce::CodeChallengeMethod;
use crate::secret;

/// Identity group that owns one or more credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    pub id: String,
    pub username: String,
    pub custom_id: String,
    pub created_at: DateTime<Utc>,
}

/// A registered OAuth 2.0 client application
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    pub name: String,
    pub client_id: String,
    /// Salted hash, see [`secret::hash_client_secret`]
    pub secret_hash: String,
    pub redirect_uris: Vec<String>,
    pub consumer_id: String,
    pub created_at: DateTime<Utc>,
}

impl Credential {
    /// Exact-match check against the registered redirect URIs
    pub fn allows_redirect(&self, redirect_uri: &str) -> bool {
        self.redirect_uris.iter().any(|uri| uri == redirect_uri)
    }

    pub fn verify_secret(&self, presented: &str) -> bool {
        secret::verify_client_secret(presented, &self.secret_hash)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("client_id", &self.client_id)
            .field("redirect_uris", &self.redirect_uris)
            .field("consumer_id", &self.consumer_id)
            .finish_non_exhaustive()
    }
}

/// End user able to use the password grant
#[derive(Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub name: String,
    pub password_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

/// Short-lived, single-use artifact of the `code` response type
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    pub id: String,
    pub code: String,
    pub client_id: String,
    pub user_id: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<CodeChallengeMethod>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl AuthorizationCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// A code can be redeemed only while unexpired and unused
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired(now) && !self.used
    }
}

impl fmt::Debug for AuthorizationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizationCode")
            .field("id", &self.id)
            .field("client_id", &self.client_id)
            .field("user_id", &self.user_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("code_challenge_method", &self.code_challenge_method)
            .field("expires_at", &self.expires_at)
            .field("used", &self.used)
            .finish_non_exhaustive()
    }
}

/// Access token, optionally paired with a refresh token
#[derive(Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: Option<DateTime<Utc>>,
    pub scope: String,
    /// `None` for client-credentials tokens
    pub user_id: Option<String>,
    pub credential_id: String,
    pub created_at: DateTime<Utc>,
}

impl Token {
    pub fn is_access_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.access_expires_at
    }

    /// Tokens without a refresh token count as refresh-expired
    pub fn is_refresh_expired(&self, now: DateTime<Utc>) -> bool {
        match (&self.refresh_token, self.refresh_expires_at) {
            (Some(_), Some(expires_at)) => now >= expires_at,
            _ => true,
        }
    }

    pub fn scopes(&self) -> Vec<String> {
        self.scope.split_whitespace().map(str::to_string).collect()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("id", &self.id)
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .field("scope", &self.scope)
            .field("user_id", &self.user_id)
            .field("credential_id", &self.credential_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn token(now: DateTime<Utc>) -> Token {
        Token {
            id: "t1".into(),
            access_token: "access".into(),
            refresh_token: Some("refresh".into()),
            access_expires_at: now + TimeDelta::seconds(60),
            refresh_expires_at: Some(now + TimeDelta::seconds(120)),
            scope: "read write".into(),
            user_id: None,
            credential_id: "c1".into(),
            created_at: now,
        }
    }

    #[test]
    fn test_token_expiry_boundaries_are_inclusive() {
        let now = Utc::now();
        let token = token(now);
        assert!(!token.is_access_expired(now + TimeDelta::seconds(59)));
        assert!(token.is_access_expired(now + TimeDelta::seconds(60)));
        assert!(!token.is_refresh_expired(now + TimeDelta::seconds(119)));
        assert!(token.is_refresh_expired(now + TimeDelta::seconds(120)));
    }

    #[test]
    fn test_token_without_refresh_is_never_refreshable() {
        let now = Utc::now();
        let mut token = token(now);
        token.refresh_token = None;
        assert!(token.is_refresh_expired(now));
    }

    #[test]
    fn test_code_validity() {
        let now = Utc::now();
        let mut code = AuthorizationCode {
            id: "id".into(),
            code: "code".into(),
            client_id: "client".into(),
            user_id: "user".into(),
            redirect_uri: "https://app.example.com/cb".into(),
            scopes: vec![],
            code_challenge: None,
            code_challenge_method: None,
            expires_at: now + TimeDelta::seconds(600),
            used: false,
            created_at: now,
        };
        assert!(code.is_valid(now));
        assert!(!code.is_valid(now + TimeDelta::seconds(600)));
        code.used = true;
        assert!(!code.is_valid(now));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let now = Utc::now();
        let credential = Credential {
            id: "id".into(),
            name: "app".into(),
            client_id: "client".into(),
            secret_hash: "salt$digest".into(),
            redirect_uris: vec![],
            consumer_id: "consumer".into(),
            created_at: now,
        };
        assert!(!format!("{credential:?}").contains("digest"));
        assert!(!format!("{:?}", token(now)).contains("access\""));
    }
}
