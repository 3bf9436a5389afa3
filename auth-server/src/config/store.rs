use confique::Config;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Specifies which store implementation to use
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StoreBackendKind {
    #[default]
    InMemory,
    Redis,
}

/// Unknown value for `AUTH_STORE_BACKEND`
#[derive(Debug, thiserror::Error)]
#[error("unknown store backend '{0}', expected 'in-memory' or 'redis'")]
pub struct UnknownBackend(String);

impl FromStr for StoreBackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in-memory" | "memory" => Ok(Self::InMemory),
            "redis" => Ok(Self::Redis),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for StoreBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InMemory => f.write_str("in-memory"),
            Self::Redis => f.write_str("redis"),
        }
    }
}

/// Configuration for the persistence layer
#[derive(Debug, Config, Clone, Default)]
pub struct StoreConfig {
    /// Store backend: "in-memory" (default) or "redis"
    #[config(
        env = "AUTH_STORE_BACKEND",
        default = "in-memory",
        parse_env = StoreBackendKind::from_str
    )]
    pub backend: StoreBackendKind,

    /// Redis connection string, required for the redis backend
    #[config(env = "AUTH_STORE_REDIS_URL")]
    pub redis_url: Option<String>,
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.backend == StoreBackendKind::Redis
            && self.redis_url.as_deref().is_none_or(str::is_empty)
        {
            return Err("AUTH_STORE_REDIS_URL is required for the redis backend".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend() {
        assert_eq!(
            "in-memory".parse::<StoreBackendKind>().unwrap(),
            StoreBackendKind::InMemory
        );
        assert_eq!(
            "Redis".parse::<StoreBackendKind>().unwrap(),
            StoreBackendKind::Redis
        );
        assert!("postgres".parse::<StoreBackendKind>().is_err());
    }

    #[test]
    fn test_redis_requires_url() {
        let config = StoreConfig {
            backend: StoreBackendKind::Redis,
            redis_url: None,
        };
        assert!(config.validate().is_err());

        let config = StoreConfig {
            backend: StoreBackendKind::Redis,
            redis_url: Some("redis://localhost:6379".to_string()),
        };
        assert!(config.validate().is_ok());
        assert!(StoreConfig::default().validate().is_ok());
    }
}
