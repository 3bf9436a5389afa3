use std::collections::HashMap;
use std::sync::Arc;

use super::grants::{
    AuthorizationCodeGrant, ClientCredentialsGrant, PasswordGrant, RefreshTokenGrant,
};
use super::{EngineCore, GrantEngine};
use crate::clock::{Clock, SystemClock};
use crate::secret::{BcryptHasher, PasswordHasher};
use crate::settings::EngineSettings;
use crate::store::Store;

/// A builder for configuring a [`GrantEngine`].
/// Only the store is required; everything else falls back to a default.
pub struct GrantEngineBuilder<S: Store> {
    store: Arc<S>,
    clock: Option<Arc<dyn Clock>>,
    hasher: Option<Arc<dyn PasswordHasher>>,
    settings: EngineSettings,
}

impl<S: Store> GrantEngineBuilder<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            clock: None,
            hasher: None,
            settings: EngineSettings::default(),
        }
    }

    /// Overrides the time source (defaults to the system clock).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Overrides the password hasher (defaults to bcrypt at the default cost).
    pub fn with_password_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Builds the engine with the four standard grants registered.
    pub fn build(self) -> GrantEngine<S> {
        let core = EngineCore {
            store: self.store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            hasher: self
                .hasher
                .unwrap_or_else(|| Arc::new(BcryptHasher::default())),
            settings: self.settings,
        };

        let mut engine = GrantEngine {
            core,
            grants: HashMap::new(),
        };
        engine.register_grant(AuthorizationCodeGrant);
        engine.register_grant(ClientCredentialsGrant);
        engine.register_grant(PasswordGrant);
        engine.register_grant(RefreshTokenGrant);
        engine
    }
}
