use crate::config::AuthServerConfig;
use crate::store::StoreBackend;
use oauth_engine::{GrantEngine, Store, TokenValidator};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AuthServerConfig>,
    pub engine: Arc<GrantEngine<StoreBackend>>,
    pub validator: TokenValidator<StoreBackend>,
}

impl AppState {
    /// Build the grant engine on top of `store` with settings taken from `config`
    pub fn new(config: AuthServerConfig, store: StoreBackend) -> Self {
        let engine = GrantEngine::builder(Arc::new(store))
            .with_settings(config.engine_settings())
            .build();
        Self::with_engine(config, engine)
    }

    /// Wrap an already configured engine
    pub fn with_engine(config: AuthServerConfig, engine: GrantEngine<StoreBackend>) -> Self {
        let validator = engine.validator();
        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            validator,
        }
    }

    pub fn store(&self) -> &StoreBackend {
        self.engine.store()
    }

    /// Check if the store is reachable
    pub async fn health_check(&self) -> Result<(), String> {
        self.store().health_check().await
    }
}
