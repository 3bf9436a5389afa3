/// Provision key used when none is configured
pub const DEFAULT_PROVISION_KEY: &str = "default-provision-key-change-in-production";

/// Runtime knobs of the grant engine and validator. TTLs are in seconds.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub access_token_ttl: u64,
    /// `0` disables refresh tokens
    pub refresh_token_ttl: u64,
    pub auth_code_ttl: u64,
    /// How long before access expiry introspection starts reporting `should_refresh`
    pub refresh_window: u64,
    pub enable_authorization_code: bool,
    pub enable_client_credentials: bool,
    pub enable_implicit_grant: bool,
    pub enable_password_grant: bool,
    pub enable_pkce: bool,
    pub pkce_required: bool,
    /// Keep the same refresh token value across refreshes
    pub reuse_refresh_token: bool,
    pub provision_key: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            access_token_ttl: 7200,
            refresh_token_ttl: 1_209_600,
            auth_code_ttl: 600,
            refresh_window: 3600,
            enable_authorization_code: true,
            enable_client_credentials: true,
            enable_implicit_grant: false,
            enable_password_grant: false,
            enable_pkce: true,
            pkce_required: false,
            reuse_refresh_token: false,
            provision_key: DEFAULT_PROVISION_KEY.to_string(),
        }
    }
}

impl EngineSettings {
    pub fn issues_refresh_tokens(&self) -> bool {
        self.refresh_token_ttl > 0
    }
}
