pub(crate) use crate::config::oauth::OAuthConfig;
pub(crate) use crate::config::store::{StoreBackendKind, StoreConfig};
use confique::Config;
use oauth_engine::settings::DEFAULT_PROVISION_KEY;
use oauth_engine::EngineSettings;
use std::path::PathBuf;
use thiserror::Error;

pub mod oauth;
pub mod store;

/// TOML file read when `AUTH_CONFIG_FILE` is not set. A missing file is ignored.
pub const DEFAULT_CONFIG_FILE: &str = "auth-server.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] confique::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure for the authorization server
#[derive(Debug, Config, Clone)]
pub struct AuthServerConfig {
    /// Address to bind (default: 0.0.0.0)
    #[config(env = "AUTH_HOST", default = "0.0.0.0")]
    pub host: String,

    /// The port the server will listen to (default: 8080)
    #[config(env = "AUTH_PORT", default = 8080)]
    pub port: u16,

    /// Shared secret the login gateway presents on authorization requests
    #[config(env = "AUTH_PROVISION_KEY", default = "default-provision-key-change-in-production")]
    pub provision_key: String,

    /// JSON file with clients to create at startup
    #[config(env = "AUTH_SEED_CLIENTS_PATH")]
    pub seed_clients_path: Option<String>,

    #[config(nested)]
    pub oauth: OAuthConfig,

    #[config(nested)]
    pub store: StoreConfig,
}

impl AuthServerConfig {
    /// Load from environment variables, then the TOML file, then defaults
    pub fn new() -> Result<Self, ConfigError> {
        let path = std::env::var("AUTH_CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load(path)
    }

    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let config = Self::builder().env().file(path.into()).load()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provision_key.is_empty() {
            return Err(ConfigError::Invalid(
                "provision_key must not be empty".to_string(),
            ));
        }
        self.oauth.validate().map_err(ConfigError::Invalid)?;
        self.store.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }

    pub fn uses_default_provision_key(&self) -> bool {
        self.provision_key == DEFAULT_PROVISION_KEY
    }

    pub fn engine_settings(&self) -> EngineSettings {
        self.oauth.engine_settings(&self.provision_key)
    }

    #[cfg(test)]
    pub fn for_test() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0, // Let the OS choose a port
            provision_key: "test-provision-key".to_string(),
            seed_clients_path: None,
            oauth: OAuthConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests in this module mutate process-wide environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for (name, _value) in std::env::vars() {
            if name.starts_with("AUTH_") {
                std::env::remove_var(name);
            }
        }
    }

    fn missing_file() -> PathBuf {
        std::env::temp_dir().join("auth-server-test-missing.toml")
    }

    #[test]
    fn test_default_config() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        let config = AuthServerConfig::load(missing_file()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert!(config.uses_default_provision_key());
        assert_eq!(config.seed_clients_path, None);
        assert_eq!(config.oauth.access_token_ttl, 7200);
        assert_eq!(config.oauth.refresh_token_ttl, 1_209_600);
        assert_eq!(config.oauth.refresh_window, 3600);
        assert!(!config.oauth.enable_password_grant);
        assert_eq!(config.store.backend, StoreBackendKind::InMemory);
        assert_eq!(config.store.redis_url, None);
    }

    #[test]
    fn test_env_overrides() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        std::env::set_var("AUTH_PORT", "9000");
        std::env::set_var("AUTH_PROVISION_KEY", "secret-key");
        std::env::set_var("AUTH_OAUTH_ACCESS_TOKEN_TTL", "60");
        std::env::set_var("AUTH_OAUTH_ENABLE_PASSWORD_GRANT", "true");
        std::env::set_var("AUTH_STORE_BACKEND", "redis");
        std::env::set_var("AUTH_STORE_REDIS_URL", "redis://localhost:6379");

        let config = AuthServerConfig::load(missing_file()).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.provision_key, "secret-key");
        assert!(!config.uses_default_provision_key());
        assert_eq!(config.oauth.access_token_ttl, 60);
        assert!(config.oauth.enable_password_grant);
        assert_eq!(config.store.backend, StoreBackendKind::Redis);
        assert_eq!(
            config.store.redis_url.as_deref(),
            Some("redis://localhost:6379")
        );

        clear_env();
    }

    #[test]
    fn test_toml_file() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        let path = std::env::temp_dir().join("auth-server-test-config.toml");
        std::fs::write(
            &path,
            r#"
port = 7000

[oauth]
enable_implicit_grant = true
refresh_token_ttl = 0
"#,
        )
        .unwrap();
        // Environment wins over the file
        std::env::set_var("AUTH_PORT", "7001");

        let config = AuthServerConfig::load(&path).unwrap();
        assert_eq!(config.port, 7001);
        assert!(config.oauth.enable_implicit_grant);
        assert_eq!(config.oauth.refresh_token_ttl, 0);
        assert!(!config.engine_settings().issues_refresh_tokens());

        clear_env();
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        std::env::set_var("AUTH_STORE_BACKEND", "redis");

        let result = AuthServerConfig::load(missing_file());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        std::env::set_var("AUTH_STORE_BACKEND", "postgres");
        let result = AuthServerConfig::load(missing_file());
        assert!(matches!(result, Err(ConfigError::Load(_))));

        clear_env();
    }
}
