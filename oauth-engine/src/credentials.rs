//! Client provisioning, seeding and user accounts

use chrono::Utc;
use log::{debug, info, warn};
use serde::Deserialize;

use crate::clock::{new_client_id, new_client_secret, new_id};
use crate::error::ProvisionError;
use crate::models::{Credential, User};
use crate::secret::{PasswordHasher, hash_client_secret};
use crate::store::Store;

/// Consumer that owns every seeded client
pub const GLOBAL_CONSUMER_USERNAME: &str = "ccs-global-consumer";
pub const GLOBAL_CONSUMER_CUSTOM_ID: &str = "ccs-global-id";

/// Parameters for a new client application
#[derive(Clone, Default)]
pub struct NewClient {
    pub name: String,
    /// Generated when absent
    pub client_id: Option<String>,
    /// Generated when absent
    pub client_secret: Option<String>,
    pub redirect_uris: Vec<String>,
}

/// A freshly created client. The plaintext secret is only ever available here.
#[derive(Clone)]
pub struct ProvisionedClient {
    pub credential: Credential,
    pub client_secret: String,
}

/// Create a client owned by the given consumer
pub async fn provision_client<S: Store>(
    store: &S,
    consumer_username: &str,
    consumer_custom_id: &str,
    client: NewClient,
) -> Result<ProvisionedClient, ProvisionError> {
    if client.name.trim().is_empty() {
        return Err(ProvisionError::InvalidInput("client name is required".into()));
    }
    let consumer = store
        .find_or_create_consumer(consumer_username, consumer_custom_id)
        .await?;

    let client_id = client
        .client_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(new_client_id);
    let client_secret = client
        .client_secret
        .filter(|secret| !secret.is_empty())
        .unwrap_or_else(new_client_secret);

    let credential = Credential {
        id: new_id(),
        name: client.name,
        client_id,
        secret_hash: hash_client_secret(&client_secret),
        redirect_uris: client.redirect_uris,
        consumer_id: consumer.id,
        created_at: Utc::now(),
    };
    store.insert_credential(credential.clone()).await?;

    info!(
        "Provisioned client '{}' ({})",
        credential.client_id, credential.name
    );
    Ok(ProvisionedClient {
        credential,
        client_secret,
    })
}

/// A client entry of a seed file. Both credentials are fixed so re-seeding
/// finds the same client_id again.
#[derive(Deserialize)]
pub struct SeedClient {
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

/// Seed clients from a JSON array of `{name, client_id, client_secret, redirect_uris?}`.
///
/// Clients whose client_id already exists are skipped, as are entries with an
/// empty client_id or client_secret. Returns how many were created.
pub async fn seed_clients<S: Store>(store: &S, json: &str) -> Result<usize, ProvisionError> {
    let clients: Vec<SeedClient> = serde_json::from_str(json)?;
    let mut created = 0;

    for client in clients {
        if client.client_id.trim().is_empty() || client.client_secret.is_empty() {
            warn!(
                "Seeded client '{}' has no client_id or client_secret, skipping",
                client.name
            );
            continue;
        }
        if store
            .find_credential_by_client_id(&client.client_id)
            .await?
            .is_some()
        {
            debug!("Client '{}' already exists, skipping", client.client_id);
            continue;
        }
        let new_client = NewClient {
            name: client.name,
            client_id: Some(client.client_id),
            client_secret: Some(client.client_secret),
            redirect_uris: client.redirect_uris,
        };
        match provision_client(
            store,
            GLOBAL_CONSUMER_USERNAME,
            GLOBAL_CONSUMER_CUSTOM_ID,
            new_client,
        )
        .await
        {
            Ok(_) => created += 1,
            // Lost a race against another seeder
            Err(ProvisionError::Conflict(msg)) => debug!("Skipping seeded client: {}", msg),
            Err(e) => return Err(e),
        }
    }

    info!("Seeded {} client(s)", created);
    Ok(created)
}

/// Parameters for a new end user
#[derive(Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub name: String,
    pub password: String,
}

/// Register an active user with a hashed password
pub async fn register_user<S: Store>(
    store: &S,
    hasher: &dyn PasswordHasher,
    new_user: NewUser,
) -> Result<User, ProvisionError> {
    if new_user.email.trim().is_empty()
        || new_user.username.trim().is_empty()
        || new_user.password.is_empty()
    {
        return Err(ProvisionError::InvalidInput(
            "email, username and password are required".into(),
        ));
    }

    let user = User {
        id: new_id(),
        email: new_user.email.trim().to_string(),
        username: new_user.username.trim().to_string(),
        name: new_user.name,
        password_hash: hasher.hash(&new_user.password).await?,
        active: true,
        created_at: Utc::now(),
    };
    store.insert_user(user.clone()).await?;

    info!("Registered user {}", user.id);
    Ok(user)
}

/// Disable a user without deleting it. Returns `false` if the user does not exist.
pub async fn deactivate_user<S: Store>(store: &S, user_id: &str) -> Result<bool, ProvisionError> {
    let updated = store.set_user_active(user_id, false).await?;
    if updated {
        info!("Deactivated user {}", user_id);
    }
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::BcryptHasher;
    use crate::store::MemoryStore;

    fn new_user(email: &str, username: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            username: username.to_string(),
            name: "Test".to_string(),
            password: "password123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_provision_generates_missing_values() {
        let store = MemoryStore::new();
        let provisioned = provision_client(
            &store,
            "acme",
            "acme-id",
            NewClient {
                name: "web".into(),
                redirect_uris: vec!["https://app.example.com/cb".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(!provisioned.credential.client_id.is_empty());
        assert!(!provisioned.client_secret.is_empty());
        assert!(
            provisioned
                .credential
                .verify_secret(&provisioned.client_secret)
        );
        assert_ne!(
            provisioned.credential.secret_hash,
            provisioned.client_secret
        );
    }

    #[tokio::test]
    async fn test_provision_duplicate_client_id() {
        let store = MemoryStore::new();
        let client = NewClient {
            name: "web".into(),
            client_id: Some("fixed".into()),
            ..Default::default()
        };
        provision_client(&store, "acme", "acme-id", client.clone())
            .await
            .unwrap();
        let second = provision_client(&store, "acme", "acme-id", client).await;
        assert!(matches!(second, Err(ProvisionError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_seed_clients_is_idempotent() {
        let store = MemoryStore::new();
        let json = r#"[
            {"name": "one", "client_id": "client-one", "client_secret": "secret-one"},
            {"name": "two", "client_id": "client-two", "client_secret": "secret-two",
             "redirect_uris": ["https://two.example.com/cb"]}
        ]"#;

        assert_eq!(seed_clients(&store, json).await.unwrap(), 2);
        assert_eq!(seed_clients(&store, json).await.unwrap(), 0);

        let one = store
            .find_credential_by_client_id("client-one")
            .await
            .unwrap()
            .unwrap();
        let two = store
            .find_credential_by_client_id("client-two")
            .await
            .unwrap()
            .unwrap();
        assert!(one.verify_secret("secret-one"));
        assert_eq!(one.consumer_id, two.consumer_id);
        assert!(two.allows_redirect("https://two.example.com/cb"));
    }

    #[tokio::test]
    async fn test_seed_clients_requires_fixed_credentials() {
        let store = MemoryStore::new();
        let missing = r#"[{"name": "Backend"}]"#;
        assert!(matches!(
            seed_clients(&store, missing).await,
            Err(ProvisionError::Seed(_))
        ));

        let empty = r#"[{"name": "Backend", "client_id": "", "client_secret": "s"},
                        {"name": "Batch", "client_id": "batch", "client_secret": ""}]"#;
        for _ in 0..3 {
            assert_eq!(seed_clients(&store, empty).await.unwrap(), 0);
        }
        assert!(
            store
                .find_credential_by_client_id("batch")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_seed_clients_rejects_bad_json() {
        let store = MemoryStore::new();
        let result = seed_clients(&store, "{not json").await;
        assert!(matches!(result, Err(ProvisionError::Seed(_))));
    }

    #[tokio::test]
    async fn test_register_user() {
        let store = MemoryStore::new();
        let hasher = BcryptHasher::new(4);
        let user = register_user(&store, &hasher, new_user("a@example.com", "alice"))
            .await
            .unwrap();

        assert!(user.active);
        assert_ne!(user.password_hash, "password123");
        assert!(
            hasher
                .verify("password123", &user.password_hash)
                .await
                .unwrap()
        );

        let duplicate = register_user(&store, &hasher, new_user("a@example.com", "alice2")).await;
        assert!(matches!(duplicate, Err(ProvisionError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_register_user_requires_fields() {
        let store = MemoryStore::new();
        let hasher = BcryptHasher::new(4);
        let result = register_user(&store, &hasher, new_user("", "alice")).await;
        assert!(matches!(result, Err(ProvisionError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_deactivate_user() {
        let store = MemoryStore::new();
        let hasher = BcryptHasher::new(4);
        let user = register_user(&store, &hasher, new_user("a@example.com", "alice"))
            .await
            .unwrap();

        assert!(deactivate_user(&store, &user.id).await.unwrap());
        let stored = store.find_user_by_id(&user.id).await.unwrap().unwrap();
        assert!(!stored.active);
        assert!(!deactivate_user(&store, "missing").await.unwrap());
    }
}
