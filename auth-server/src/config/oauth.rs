//! OAuth 2.0 grant configuration

use confique::Config;
use oauth_engine::EngineSettings;

/// Token lifetimes and flow toggles
#[derive(Debug, Config, Clone)]
pub struct OAuthConfig {
    /// Access token TTL in seconds (default: 7200 = 2 hours)
    #[config(env = "AUTH_OAUTH_ACCESS_TOKEN_TTL", default = 7200)]
    pub access_token_ttl: u64,

    /// Refresh token TTL in seconds, 0 disables refresh tokens (default: 1209600 = 14 days)
    #[config(env = "AUTH_OAUTH_REFRESH_TOKEN_TTL", default = 1209600)]
    pub refresh_token_ttl: u64,

    /// Authorization code TTL in seconds (default: 600)
    #[config(env = "AUTH_OAUTH_AUTH_CODE_TTL", default = 600)]
    pub auth_code_ttl: u64,

    /// Seconds before access expiry from which introspection reports `should_refresh`
    /// (default: 3600)
    #[config(env = "AUTH_OAUTH_REFRESH_WINDOW", default = 3600)]
    pub refresh_window: u64,

    /// Enable the authorization code flow (default: true)
    #[config(env = "AUTH_OAUTH_ENABLE_AUTHORIZATION_CODE", default = true)]
    pub enable_authorization_code: bool,

    /// Enable the client credentials grant (default: true)
    #[config(env = "AUTH_OAUTH_ENABLE_CLIENT_CREDENTIALS", default = true)]
    pub enable_client_credentials: bool,

    /// Enable the implicit flow (default: false)
    #[config(env = "AUTH_OAUTH_ENABLE_IMPLICIT_GRANT", default = false)]
    pub enable_implicit_grant: bool,

    /// Enable the resource owner password grant (default: false)
    #[config(env = "AUTH_OAUTH_ENABLE_PASSWORD_GRANT", default = false)]
    pub enable_password_grant: bool,

    /// Record and verify PKCE challenges (default: true)
    #[config(env = "AUTH_OAUTH_ENABLE_PKCE", default = true)]
    pub enable_pkce: bool,

    /// Reject authorization code requests without a challenge (default: false)
    #[config(env = "AUTH_OAUTH_PKCE_REQUIRED", default = false)]
    pub pkce_required: bool,

    /// Keep the refresh token value across refreshes (default: false)
    #[config(env = "AUTH_OAUTH_REUSE_REFRESH_TOKEN", default = false)]
    pub reuse_refresh_token: bool,
}

impl OAuthConfig {
    /// Check combinations the individual fields cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.access_token_ttl == 0 {
            return Err("access_token_ttl must be greater than zero".to_string());
        }
        if self.auth_code_ttl == 0 {
            return Err("auth_code_ttl must be greater than zero".to_string());
        }
        if self.refresh_token_ttl != 0 && self.refresh_token_ttl < self.access_token_ttl {
            return Err(format!(
                "refresh_token_ttl ({}) must not be shorter than access_token_ttl ({})",
                self.refresh_token_ttl, self.access_token_ttl
            ));
        }
        if self.pkce_required && !self.enable_pkce {
            return Err("pkce_required needs enable_pkce".to_string());
        }
        Ok(())
    }

    /// Settings handed to the grant engine
    pub fn engine_settings(&self, provision_key: &str) -> EngineSettings {
        EngineSettings {
            access_token_ttl: self.access_token_ttl,
            refresh_token_ttl: self.refresh_token_ttl,
            auth_code_ttl: self.auth_code_ttl,
            refresh_window: self.refresh_window,
            enable_authorization_code: self.enable_authorization_code,
            enable_client_credentials: self.enable_client_credentials,
            enable_implicit_grant: self.enable_implicit_grant,
            enable_password_grant: self.enable_password_grant,
            enable_pkce: self.enable_pkce,
            pkce_required: self.pkce_required,
            reuse_refresh_token: self.reuse_refresh_token,
            provision_key: provision_key.to_string(),
        }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        let defaults = EngineSettings::default();
        Self {
            access_token_ttl: defaults.access_token_ttl,
            refresh_token_ttl: defaults.refresh_token_ttl,
            auth_code_ttl: defaults.auth_code_ttl,
            refresh_window: defaults.refresh_window,
            enable_authorization_code: defaults.enable_authorization_code,
            enable_client_credentials: defaults.enable_client_credentials,
            enable_implicit_grant: defaults.enable_implicit_grant,
            enable_password_grant: defaults.enable_password_grant,
            enable_pkce: defaults.enable_pkce,
            pkce_required: defaults.pkce_required,
            reuse_refresh_token: defaults.reuse_refresh_token,
        }
    }
}
