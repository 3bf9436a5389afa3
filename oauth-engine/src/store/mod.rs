use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{AuthorizationCode, Consumer, Credential, Token, User};

pub mod memory;

pub use memory::MemoryStore;

/// Persistence contract for consumers, credentials, users, codes and tokens.
///
/// The grant engine relies on two operations being atomic inside the backend:
/// [`Store::mark_authorization_code_used`] must flip the flag only if it is still
/// unset, and [`Store::rotate_token`] must never leave the replacement stored while
/// the old row survives. Every other method is a plain read or write.
///
/// Expiry is not enforced here. Callers compare timestamps on read.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Return the consumer with this username, creating it if missing
    async fn find_or_create_consumer(
        &self,
        username: &str,
        custom_id: &str,
    ) -> Result<Consumer, StoreError>;

    /// Insert a credential. Fails with [`StoreError::Conflict`] if the client_id is taken.
    async fn insert_credential(&self, credential: Credential) -> Result<(), StoreError>;

    async fn find_credential_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<Credential>, StoreError>;

    async fn find_credential_by_id(&self, id: &str) -> Result<Option<Credential>, StoreError>;

    /// Insert a user. Fails with [`StoreError::Conflict`] if the email or username is taken.
    async fn insert_user(&self, user: User) -> Result<(), StoreError>;

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Returns `false` if the user does not exist
    async fn set_user_active(&self, id: &str, active: bool) -> Result<bool, StoreError>;

    async fn insert_authorization_code(&self, code: AuthorizationCode) -> Result<(), StoreError>;

    /// Look up a code issued to `client_id`. Codes of other clients are not visible.
    async fn find_authorization_code(
        &self,
        code: &str,
        client_id: &str,
    ) -> Result<Option<AuthorizationCode>, StoreError>;

    /// Set `used` if it is currently unset. Returns whether this call flipped it.
    async fn mark_authorization_code_used(&self, code: &str) -> Result<bool, StoreError>;

    async fn insert_token(&self, token: Token) -> Result<(), StoreError>;

    async fn find_token_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<Token>, StoreError>;

    /// Look up a token by refresh value, restricted to the owning credential
    async fn find_token_by_refresh_token(
        &self,
        refresh_token: &str,
        credential_id: &str,
    ) -> Result<Option<Token>, StoreError>;

    /// Delete `old` and store `replacement` as one step.
    ///
    /// Returns `false` without storing anything if `old` was already gone.
    async fn rotate_token(&self, old: &Token, replacement: Token) -> Result<bool, StoreError>;

    /// Returns whether a row was deleted
    async fn delete_token(&self, access_token: &str) -> Result<bool, StoreError>;

    async fn health_check(&self) -> Result<(), String>;
}
