use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache as MokaCache;
use moka::ops::compute::{CompResult, Op};
use std::future::ready;

use super::Store;
use crate::clock::new_id;
use crate::error::StoreError;
use crate::models::{AuthorizationCode, Consumer, Credential, Token, User};

/// Process-local store built on moka caches without eviction.
///
/// Uniqueness is claimed through `entry().or_insert_with()`, which moka runs at most
/// once per key, and conditional updates go through `and_compute_with()`.
#[derive(Clone)]
pub struct MemoryStore {
    /// Keyed by username
    consumers: MokaCache<String, Consumer>,
    /// custom_id -> username
    consumer_custom_ids: MokaCache<String, String>,
    /// Keyed by client_id
    credentials: MokaCache<String, Credential>,
    /// id -> client_id
    credential_ids: MokaCache<String, String>,
    users: MokaCache<String, User>,
    /// email -> user id
    user_emails: MokaCache<String, String>,
    /// username -> user id
    user_usernames: MokaCache<String, String>,
    codes: MokaCache<String, AuthorizationCode>,
    /// Keyed by access token
    tokens: MokaCache<String, Token>,
    /// refresh token -> access token
    refresh_index: MokaCache<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            consumers: MokaCache::builder().build(),
            consumer_custom_ids: MokaCache::builder().build(),
            credentials: MokaCache::builder().build(),
            credential_ids: MokaCache::builder().build(),
            users: MokaCache::builder().build(),
            user_emails: MokaCache::builder().build(),
            user_usernames: MokaCache::builder().build(),
            codes: MokaCache::builder().build(),
            tokens: MokaCache::builder().build(),
            refresh_index: MokaCache::builder().build(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_or_create_consumer(
        &self,
        username: &str,
        custom_id: &str,
    ) -> Result<Consumer, StoreError> {
        let entry = self
            .consumers
            .entry_by_ref(username)
            .or_insert_with(ready(Consumer {
                id: new_id(),
                username: username.to_string(),
                custom_id: custom_id.to_string(),
                created_at: Utc::now(),
            }))
            .await;

        if entry.is_fresh() {
            let owner = self
                .consumer_custom_ids
                .entry_by_ref(custom_id)
                .or_insert_with(ready(username.to_string()))
                .await;
            if !owner.is_fresh() && owner.value() != username {
                self.consumers.remove(username).await;
                return Err(StoreError::Conflict(format!(
                    "consumer custom_id '{custom_id}' already exists"
                )));
            }
        }
        Ok(entry.into_value())
    }

    async fn insert_credential(&self, credential: Credential) -> Result<(), StoreError> {
        let entry = self
            .credentials
            .entry_by_ref(&credential.client_id)
            .or_insert_with(ready(credential.clone()))
            .await;
        if !entry.is_fresh() {
            return Err(StoreError::Conflict(format!(
                "client_id '{}' already exists",
                credential.client_id
            )));
        }
        self.credential_ids
            .insert(credential.id, credential.client_id)
            .await;
        Ok(())
    }

    async fn find_credential_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<Credential>, StoreError> {
        Ok(self.credentials.get(client_id).await)
    }

    async fn find_credential_by_id(&self, id: &str) -> Result<Option<Credential>, StoreError> {
        match self.credential_ids.get(id).await {
            Some(client_id) => Ok(self.credentials.get(&client_id).await),
            None => Ok(None),
        }
    }

    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let email = self
            .user_emails
            .entry_by_ref(&user.email)
            .or_insert_with(ready(user.id.clone()))
            .await;
        if !email.is_fresh() {
            return Err(StoreError::Conflict("email already registered".to_string()));
        }

        let username = self
            .user_usernames
            .entry_by_ref(&user.username)
            .or_insert_with(ready(user.id.clone()))
            .await;
        if !username.is_fresh() {
            self.user_emails.remove(&user.email).await;
            return Err(StoreError::Conflict("username already taken".to_string()));
        }

        self.users.insert(user.id.clone(), user).await;
        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(id).await)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        match self.user_emails.get(email).await {
            Some(id) => Ok(self.users.get(&id).await),
            None => Ok(None),
        }
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        match self.user_usernames.get(username).await {
            Some(id) => Ok(self.users.get(&id).await),
            None => Ok(None),
        }
    }

    async fn set_user_active(&self, id: &str, active: bool) -> Result<bool, StoreError> {
        let result = self
            .users
            .entry_by_ref(id)
            .and_compute_with(|existing| {
                let op = match existing {
                    Some(entry) => {
                        let mut user = entry.into_value();
                        user.active = active;
                        Op::Put(user)
                    }
                    None => Op::Nop,
                };
                ready(op)
            })
            .await;
        Ok(matches!(result, CompResult::ReplacedWith(_)))
    }

    async fn insert_authorization_code(&self, code: AuthorizationCode) -> Result<(), StoreError> {
        let entry = self
            .codes
            .entry_by_ref(&code.code)
            .or_insert_with(ready(code.clone()))
            .await;
        if !entry.is_fresh() {
            return Err(StoreError::Conflict(
                "authorization code already exists".to_string(),
            ));
        }
        Ok(())
    }

    async fn find_authorization_code(
        &self,
        code: &str,
        client_id: &str,
    ) -> Result<Option<AuthorizationCode>, StoreError> {
        Ok(self
            .codes
            .get(code)
            .await
            .filter(|c| c.client_id == client_id))
    }

    async fn mark_authorization_code_used(&self, code: &str) -> Result<bool, StoreError> {
        let result = self
            .codes
            .entry_by_ref(code)
            .and_compute_with(|existing| {
                let op = match existing {
                    Some(entry) if !entry.value().used => {
                        let mut code = entry.into_value();
                        code.used = true;
                        Op::Put(code)
                    }
                    _ => Op::Nop,
                };
                ready(op)
            })
            .await;
        Ok(matches!(result, CompResult::ReplacedWith(_)))
    }

    async fn insert_token(&self, token: Token) -> Result<(), StoreError> {
        let entry = self
            .tokens
            .entry_by_ref(&token.access_token)
            .or_insert_with(ready(token.clone()))
            .await;
        if !entry.is_fresh() {
            return Err(StoreError::Conflict("access token already exists".to_string()));
        }
        if let Some(refresh) = token.refresh_token {
            self.refresh_index.insert(refresh, token.access_token).await;
        }
        Ok(())
    }

    async fn find_token_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<Token>, StoreError> {
        Ok(self.tokens.get(access_token).await)
    }

    async fn find_token_by_refresh_token(
        &self,
        refresh_token: &str,
        credential_id: &str,
    ) -> Result<Option<Token>, StoreError> {
        let Some(access_token) = self.refresh_index.get(refresh_token).await else {
            return Ok(None);
        };
        Ok(self
            .tokens
            .get(&access_token)
            .await
            .filter(|t| t.credential_id == credential_id))
    }

    async fn rotate_token(&self, old: &Token, replacement: Token) -> Result<bool, StoreError> {
        // Only the caller that actually removes the old row may store a replacement
        if self.tokens.remove(&old.access_token).await.is_none() {
            return Ok(false);
        }
        if let Some(refresh) = &old.refresh_token {
            self.refresh_index.remove(refresh).await;
        }
        self.insert_token(replacement).await?;
        Ok(true)
    }

    async fn delete_token(&self, access_token: &str) -> Result<bool, StoreError> {
        match self.tokens.remove(access_token).await {
            Some(token) => {
                if let Some(refresh) = &token.refresh_token {
                    self.refresh_index.remove(refresh).await;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> Result<(), String> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use std::sync::Arc;

    fn test_user(id: &str, email: &str, username: &str) -> User {
        User {
            id: id.to_string(),
            email: email.to_string(),
            username: username.to_string(),
            name: "Test User".to_string(),
            password_hash: "hash".to_string(),
            active: true,
            created_at: Utc::now(),
        }
    }

    fn test_token(access: &str, refresh: Option<&str>) -> Token {
        let now = Utc::now();
        Token {
            id: new_id(),
            access_token: access.to_string(),
            refresh_token: refresh.map(str::to_string),
            access_expires_at: now + TimeDelta::seconds(60),
            refresh_expires_at: refresh.map(|_| now + TimeDelta::seconds(120)),
            scope: "read".to_string(),
            user_id: None,
            credential_id: "cred-1".to_string(),
            created_at: now,
        }
    }

    fn test_code(code: &str) -> AuthorizationCode {
        let now = Utc::now();
        AuthorizationCode {
            id: new_id(),
            code: code.to_string(),
            client_id: "client-1".to_string(),
            user_id: "user-1".to_string(),
            redirect_uri: "https://app.example.com/cb".to_string(),
            scopes: vec!["read".to_string()],
            code_challenge: None,
            code_challenge_method: None,
            expires_at: now + TimeDelta::seconds(600),
            used: false,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_find_or_create_consumer_is_idempotent() {
        let store = MemoryStore::new();
        let first = store
            .find_or_create_consumer("global", "global-id")
            .await
            .unwrap();
        let second = store
            .find_or_create_consumer("global", "global-id")
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_consumer_custom_id_is_unique() {
        let store = MemoryStore::new();
        store.find_or_create_consumer("a", "shared").await.unwrap();
        let result = store.find_or_create_consumer("b", "shared").await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        // The losing username is not left behind
        assert!(store.consumers.get("b").await.is_none());
    }

    #[tokio::test]
    async fn test_user_uniqueness() {
        let store = MemoryStore::new();
        store
            .insert_user(test_user("1", "a@example.com", "alice"))
            .await
            .unwrap();

        let same_email = store
            .insert_user(test_user("2", "a@example.com", "other"))
            .await;
        assert!(matches!(same_email, Err(StoreError::Conflict(_))));

        let same_username = store
            .insert_user(test_user("3", "b@example.com", "alice"))
            .await;
        assert!(matches!(same_username, Err(StoreError::Conflict(_))));

        // The rolled back email claim can be used again
        store
            .insert_user(test_user("4", "b@example.com", "bob"))
            .await
            .unwrap();
        assert_eq!(
            store
                .find_user_by_username("bob")
                .await
                .unwrap()
                .unwrap()
                .email,
            "b@example.com"
        );
    }

    #[tokio::test]
    async fn test_set_user_active() {
        let store = MemoryStore::new();
        store
            .insert_user(test_user("1", "a@example.com", "alice"))
            .await
            .unwrap();
        assert!(store.set_user_active("1", false).await.unwrap());
        assert!(!store.find_user_by_id("1").await.unwrap().unwrap().active);
        assert!(!store.set_user_active("missing", false).await.unwrap());
    }

    #[tokio::test]
    async fn test_code_lookup_is_scoped_to_client() {
        let store = MemoryStore::new();
        store.insert_authorization_code(test_code("abc")).await.unwrap();
        assert!(
            store
                .find_authorization_code("abc", "client-1")
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            store
                .find_authorization_code("abc", "client-2")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_concurrent_mark_used_flips_once() {
        let store = Arc::new(MemoryStore::new());
        store.insert_authorization_code(test_code("abc")).await.unwrap();

        let mut handles = vec![];
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.mark_authorization_code_used("abc").await.unwrap()
            }));
        }

        let mut flipped = 0;
        for handle in handles {
            if handle.await.unwrap() {
                flipped += 1;
            }
        }
        assert_eq!(flipped, 1);
        assert!(!store.mark_authorization_code_used("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_rotate_token() {
        let store = MemoryStore::new();
        let old = test_token("a1", Some("r1"));
        store.insert_token(old.clone()).await.unwrap();

        let replacement = test_token("a2", Some("r2"));
        assert!(store.rotate_token(&old, replacement).await.unwrap());

        assert!(store.find_token_by_access_token("a1").await.unwrap().is_none());
        assert!(
            store
                .find_token_by_refresh_token("r1", "cred-1")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .find_token_by_refresh_token("r2", "cred-1")
                .await
                .unwrap()
                .is_some()
        );

        // A second rotation of the same row stores nothing
        let late = test_token("a3", Some("r3"));
        assert!(!store.rotate_token(&old, late).await.unwrap());
        assert!(store.find_token_by_access_token("a3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_lookup_is_scoped_to_credential() {
        let store = MemoryStore::new();
        store
            .insert_token(test_token("a1", Some("r1")))
            .await
            .unwrap();
        assert!(
            store
                .find_token_by_refresh_token("r1", "cred-2")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_delete_token() {
        let store = MemoryStore::new();
        store
            .insert_token(test_token("a1", Some("r1")))
            .await
            .unwrap();
        assert!(store.delete_token("a1").await.unwrap());
        assert!(!store.delete_token("a1").await.unwrap());
        assert!(
            store
                .find_token_by_refresh_token("r1", "cred-1")
                .await
                .unwrap()
                .is_none()
        );
    }
}
