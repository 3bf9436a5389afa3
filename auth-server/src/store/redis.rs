use async_trait::async_trait;
use chrono::Utc;
use log::error;
use oauth_engine::clock::new_id;
use oauth_engine::models::{AuthorizationCode, Consumer, Credential, Token, User};
use oauth_engine::{Store, StoreError};
use redis::{aio::ConnectionManager, AsyncCommands, Client, Script};
use serde::{de::DeserializeOwned, Serialize};

const KEY_PREFIX: &str = "oauth";

/// Deletes the old token row and its refresh index, then stores the replacement.
/// Returns 0 without writing anything if the old row is already gone.
const ROTATE_SCRIPT: &str = r#"
if redis.call('DEL', KEYS[1]) == 0 then
    return 0
end
redis.call('DEL', KEYS[2])
redis.call('SET', KEYS[3], ARGV[1])
if ARGV[3] == '1' then
    redis.call('SET', KEYS[4], ARGV[2])
end
return 1
"#;

fn key(kind: &str, id: &str) -> String {
    format!("{KEY_PREFIX}:{kind}:{id}")
}

fn backend_error(operation: &str, err: redis::RedisError) -> StoreError {
    error!("Redis error during {}: {}", operation, err);
    StoreError::Backend(err.to_string())
}

/// Store keeping JSON rows in Redis under `oauth:*` keys.
///
/// Secondary indexes are plain string keys pointing at the primary key. Uniqueness is
/// claimed with `MSETNX`, single use of authorization codes with a `SET NX` marker,
/// and token rotation runs as one Lua script.
#[derive(Clone)]
pub struct RedisStore {
    _client: Client,
    conn_manager: ConnectionManager,
}

impl RedisStore {
    /// Connect and verify the server answers `PING`
    pub async fn new(redis_url: &str) -> Result<Self, String> {
        let client = match Client::open(redis_url) {
            Ok(client) => client,
            Err(err) => {
                return Err(format!("Failed to connect to Redis: {}", err));
            }
        };

        let conn_manager = match ConnectionManager::new(client.clone()).await {
            Ok(manager) => manager,
            Err(err) => {
                return Err(format!(
                    "Failed to create Redis connection manager: {}",
                    err
                ));
            }
        };

        let mut conn = conn_manager.clone();
        if let Err(err) = redis::cmd("PING").query_async::<String>(&mut conn).await {
            return Err(format!("Failed to ping Redis: {}", err));
        }

        Ok(Self {
            _client: client,
            conn_manager,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let mut conn = self.conn_manager.clone();
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| backend_error("GET", e))?;
        match value {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn_manager.clone();
        conn.get(key).await.map_err(|e| backend_error("GET", e))
    }

    /// Follow an index key to the JSON row it points at
    async fn get_indexed<T: DeserializeOwned>(
        &self,
        index_key: &str,
        kind: &str,
    ) -> Result<Option<T>, StoreError> {
        match self.get_string(index_key).await? {
            Some(id) => self.get_json(&key(kind, &id)).await,
            None => Ok(None),
        }
    }

    /// Set every pair, or none of them if any key already exists
    async fn set_all_if_absent(&self, pairs: &[(String, String)]) -> Result<bool, StoreError> {
        let mut conn = self.conn_manager.clone();
        let mut cmd = redis::cmd("MSETNX");
        for (k, v) in pairs {
            cmd.arg(k).arg(v);
        }
        cmd.query_async::<bool>(&mut conn)
            .await
            .map_err(|e| backend_error("MSETNX", e))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn_manager.clone();
        conn.exists(key)
            .await
            .map_err(|e| backend_error("EXISTS", e))
    }

    fn to_json<T: Serialize>(value: &T) -> Result<String, StoreError> {
        Ok(serde_json::to_string(value)?)
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn find_or_create_consumer(
        &self,
        username: &str,
        custom_id: &str,
    ) -> Result<Consumer, StoreError> {
        let consumer_key = key("consumer", username);
        if let Some(consumer) = self.get_json::<Consumer>(&consumer_key).await? {
            return Ok(consumer);
        }

        let consumer = Consumer {
            id: new_id(),
            username: username.to_string(),
            custom_id: custom_id.to_string(),
            created_at: Utc::now(),
        };
        let created = self
            .set_all_if_absent(&[
                (consumer_key.clone(), Self::to_json(&consumer)?),
                (key("consumer_custom_id", custom_id), username.to_string()),
            ])
            .await?;
        if created {
            return Ok(consumer);
        }

        // Another writer created it first, or the custom_id belongs to someone else
        match self.get_json::<Consumer>(&consumer_key).await? {
            Some(existing) => Ok(existing),
            None => Err(StoreError::Conflict(format!(
                "consumer custom_id '{custom_id}' already exists"
            ))),
        }
    }

    async fn insert_credential(&self, credential: Credential) -> Result<(), StoreError> {
        let created = self
            .set_all_if_absent(&[
                (
                    key("credential", &credential.client_id),
                    Self::to_json(&credential)?,
                ),
                (
                    key("credential_id", &credential.id),
                    credential.client_id.clone(),
                ),
            ])
            .await?;
        if !created {
            return Err(StoreError::Conflict(format!(
                "client_id '{}' already exists",
                credential.client_id
            )));
        }
        Ok(())
    }

    async fn find_credential_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<Credential>, StoreError> {
        self.get_json(&key("credential", client_id)).await
    }

    async fn find_credential_by_id(&self, id: &str) -> Result<Option<Credential>, StoreError> {
        self.get_indexed(&key("credential_id", id), "credential")
            .await
    }

    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let email_key = key("user_email", &user.email);
        let created = self
            .set_all_if_absent(&[
                (key("user", &user.id), Self::to_json(&user)?),
                (email_key.clone(), user.id.clone()),
                (key("user_username", &user.username), user.id.clone()),
            ])
            .await?;
        if created {
            return Ok(());
        }
        if self.exists(&email_key).await? {
            Err(StoreError::Conflict("email already registered".to_string()))
        } else {
            Err(StoreError::Conflict("username already taken".to_string()))
        }
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.get_json(&key("user", id)).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.get_indexed(&key("user_email", email), "user").await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.get_indexed(&key("user_username", username), "user")
            .await
    }

    async fn set_user_active(&self, id: &str, active: bool) -> Result<bool, StoreError> {
        let user_key = key("user", id);
        let Some(mut user) = self.get_json::<User>(&user_key).await? else {
            return Ok(false);
        };
        user.active = active;

        let mut conn = self.conn_manager.clone();
        let updated: Option<String> = redis::cmd("SET")
            .arg(&user_key)
            .arg(Self::to_json(&user)?)
            .arg("XX")
            .query_async(&mut conn)
            .await
            .map_err(|e| backend_error("SET XX", e))?;
        Ok(updated.is_some())
    }

    async fn insert_authorization_code(&self, code: AuthorizationCode) -> Result<(), StoreError> {
        let created = self
            .set_all_if_absent(&[(key("code", &code.code), Self::to_json(&code)?)])
            .await?;
        if !created {
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
        let Some(mut stored) = self
            .get_json::<AuthorizationCode>(&key("code", code))
            .await?
        else {
            return Ok(None);
        };
        if stored.client_id != client_id {
            return Ok(None);
        }
        stored.used = stored.used || self.exists(&key("code_used", code)).await?;
        Ok(Some(stored))
    }

    async fn mark_authorization_code_used(&self, code: &str) -> Result<bool, StoreError> {
        if !self.exists(&key("code", code)).await? {
            return Ok(false);
        }
        let mut conn = self.conn_manager.clone();
        conn.set_nx(key("code_used", code), 1)
            .await
            .map_err(|e| backend_error("SETNX", e))
    }

    async fn insert_token(&self, token: Token) -> Result<(), StoreError> {
        let mut pairs = vec![(key("token", &token.access_token), Self::to_json(&token)?)];
        if let Some(refresh) = &token.refresh_token {
            pairs.push((key("refresh", refresh), token.access_token.clone()));
        }
        if !self.set_all_if_absent(&pairs).await? {
            return Err(StoreError::Conflict("token already exists".to_string()));
        }
        Ok(())
    }

    async fn find_token_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<Token>, StoreError> {
        self.get_json(&key("token", access_token)).await
    }

    async fn find_token_by_refresh_token(
        &self,
        refresh_token: &str,
        credential_id: &str,
    ) -> Result<Option<Token>, StoreError> {
        let token = self
            .get_indexed::<Token>(&key("refresh", refresh_token), "token")
            .await?;
        Ok(token.filter(|t| t.credential_id == credential_id))
    }

    async fn rotate_token(&self, old: &Token, replacement: Token) -> Result<bool, StoreError> {
        let old_key = key("token", &old.access_token);
        let old_refresh_key = match &old.refresh_token {
            Some(refresh) => key("refresh", refresh),
            None => old_key.clone(),
        };
        let new_key = key("token", &replacement.access_token);
        let (new_refresh_key, has_refresh) = match &replacement.refresh_token {
            Some(refresh) => (key("refresh", refresh), "1"),
            None => (new_key.clone(), "0"),
        };

        let mut conn = self.conn_manager.clone();
        let rotated: i64 = Script::new(ROTATE_SCRIPT)
            .key(old_key)
            .key(old_refresh_key)
            .key(new_key)
            .key(new_refresh_key)
            .arg(Self::to_json(&replacement)?)
            .arg(&replacement.access_token)
            .arg(has_refresh)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| backend_error("rotate script", e))?;
        Ok(rotated == 1)
    }

    async fn delete_token(&self, access_token: &str) -> Result<bool, StoreError> {
        let token_key = key("token", access_token);
        let Some(token) = self.get_json::<Token>(&token_key).await? else {
            return Ok(false);
        };

        let mut conn = self.conn_manager.clone();
        let deleted: i64 = conn
            .del(&token_key)
            .await
            .map_err(|e| backend_error("DEL", e))?;
        if let Some(refresh) = &token.refresh_token {
            conn.del::<_, ()>(key("refresh", refresh))
                .await
                .map_err(|e| backend_error("DEL", e))?;
        }
        Ok(deleted == 1)
    }

    async fn health_check(&self) -> Result<(), String> {
        let mut conn = self.conn_manager.clone();
        match redis::cmd("PING").query_async::<String>(&mut conn).await {
            Ok(_) => Ok(()),
            Err(err) => Err(format!("Redis health check failed: {}", err)),
        }
    }
}
