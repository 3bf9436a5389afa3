use crate::config::{AuthServerConfig, StoreBackendKind};
use async_trait::async_trait;
use oauth_engine::models::{AuthorizationCode, Consumer, Credential, Token, User};
use oauth_engine::credentials::seed_clients;
use oauth_engine::{MemoryStore, Store, StoreError};

pub mod redis;

/// Store selected at startup from the configuration.
///
/// Every call is forwarded to the wrapped backend, so the grant engine sees a single
/// concrete store type regardless of the deployment.
#[derive(Clone)]
pub enum StoreBackend {
    /// Process-local store, lost on restart
    InMemory(MemoryStore),
    /// Shared store for multi-instance deployments
    Redis(redis::RedisStore),
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match $self {
            Self::InMemory($store) => $call,
            Self::Redis($store) => $call,
        }
    };
}

#[async_trait]
impl Store for StoreBackend {
    async fn find_or_create_consumer(
        &self,
        username: &str,
        custom_id: &str,
    ) -> Result<Consumer, StoreError> {
        dispatch!(self, s => s.find_or_create_consumer(username, custom_id).await)
    }

    async fn insert_credential(&self, credential: Credential) -> Result<(), StoreError> {
        dispatch!(self, s => s.insert_credential(credential).await)
    }

    async fn find_credential_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<Credential>, StoreError> {
        dispatch!(self, s => s.find_credential_by_client_id(client_id).await)
    }

    async fn find_credential_by_id(&self, id: &str) -> Result<Option<Credential>, StoreError> {
        dispatch!(self, s => s.find_credential_by_id(id).await)
    }

    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        dispatch!(self, s => s.insert_user(user).await)
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        dispatch!(self, s => s.find_user_by_id(id).await)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        dispatch!(self, s => s.find_user_by_email(email).await)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        dispatch!(self, s => s.find_user_by_username(username).await)
    }

    async fn set_user_active(&self, id: &str, active: bool) -> Result<bool, StoreError> {
        dispatch!(self, s => s.set_user_active(id, active).await)
    }

    async fn insert_authorization_code(&self, code: AuthorizationCode) -> Result<(), StoreError> {
        dispatch!(self, s => s.insert_authorization_code(code).await)
    }

    async fn find_authorization_code(
        &self,
        code: &str,
        client_id: &str,
    ) -> Result<Option<AuthorizationCode>, StoreError> {
        dispatch!(self, s => s.find_authorization_code(code, client_id).await)
    }

    async fn mark_authorization_code_used(&self, code: &str) -> Result<bool, StoreError> {
        dispatch!(self, s => s.mark_authorization_code_used(code).await)
    }

    async fn insert_token(&self, token: Token) -> Result<(), StoreError> {
        dispatch!(self, s => s.insert_token(token).await)
    }

    async fn find_token_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<Token>, StoreError> {
        dispatch!(self, s => s.find_token_by_access_token(access_token).await)
    }

    async fn find_token_by_refresh_token(
        &self,
        refresh_token: &str,
        credential_id: &str,
    ) -> Result<Option<Token>, StoreError> {
        dispatch!(self, s => s.find_token_by_refresh_token(refresh_token, credential_id).await)
    }

    async fn rotate_token(&self, old: &Token, replacement: Token) -> Result<bool, StoreError> {
        dispatch!(self, s => s.rotate_token(old, replacement).await)
    }

    async fn delete_token(&self, access_token: &str) -> Result<bool, StoreError> {
        dispatch!(self, s => s.delete_token(access_token).await)
    }

    async fn health_check(&self) -> Result<(), String> {
        dispatch!(self, s => s.health_check().await)
    }
}

/// Create the store named by the configuration
pub async fn create_store(config: &AuthServerConfig) -> Result<StoreBackend, StoreError> {
    match config.store.backend {
        StoreBackendKind::InMemory => Ok(StoreBackend::InMemory(MemoryStore::new())),
        StoreBackendKind::Redis => {
            let url = config.store.redis_url.as_deref().unwrap_or_default();
            if url.is_empty() {
                return Err(StoreError::Backend(
                    "Redis URL is required for the redis store".to_string(),
                ));
            }
            let store = redis::RedisStore::new(url)
                .await
                .map_err(StoreError::Backend)?;
            Ok(StoreBackend::Redis(store))
        }
    }
}

/// Create the clients listed in a JSON seed file. Returns how many were created.
pub async fn seed_from_file(store: &StoreBackend, path: &str) -> Result<usize, String> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("Failed to read {path}: {e}"))?;
    seed_clients(store, &json)
        .await
        .map_err(|e| format!("Failed to seed clients from {path}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use oauth_engine::credentials::{provision_client, NewClient};

    #[tokio::test]
    async fn test_create_in_memory_store() {
        let config = AuthServerConfig::for_test();
        let store = create_store(&config).await.unwrap();
        assert!(matches!(store, StoreBackend::InMemory(_)));
        assert!(store.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_create_redis_store_without_url() {
        let mut config = AuthServerConfig::for_test();
        config.store.backend = StoreBackendKind::Redis;
        assert!(create_store(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_dispatch_reaches_backend() {
        let store = StoreBackend::InMemory(MemoryStore::new());
        let provisioned = provision_client(
            &store,
            "acme",
            "acme-id",
            NewClient {
                name: "web".to_string(),
                client_id: Some("web-app".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let found = store
            .find_credential_by_id(&provisioned.credential.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.client_id, "web-app");
    }

    #[tokio::test]
    async fn test_seed_from_file() {
        let store = StoreBackend::InMemory(MemoryStore::new());
        let path = std::env::temp_dir().join("auth-server-test-seed.json");
        std::fs::write(
            &path,
            r#"[
                {"name": "Mobile", "client_id": "mobile-app", "client_secret": "m-secret",
                 "redirect_uris": ["com.example.app:/callback"]},
                {"name": "Backend", "client_id": "backend", "client_secret": "b-secret"}
            ]"#,
        )
        .unwrap();
        let path = path.to_string_lossy().to_string();

        assert_eq!(seed_from_file(&store, &path).await.unwrap(), 2);
        // A restart seeds nothing new
        assert_eq!(seed_from_file(&store, &path).await.unwrap(), 0);
        assert!(store
            .find_credential_by_client_id("mobile-app")
            .await
            .unwrap()
            .is_some());

        assert!(seed_from_file(&store, "/nonexistent/seed.json").await.is_err());
        let _ = std::fs::remove_file(path);
    }
}
