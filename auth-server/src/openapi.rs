use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

pub(crate) const HEALTH_TAG: &str = "Health API";
pub(crate) const OAUTH_TAG: &str = "OAuth 2.0";
pub(crate) const AUTH_TAG: &str = "Accounts API";
pub(crate) const PROFILE_TAG: &str = "Protected Resources";

#[derive(OpenApi)]
#[openapi(
    modifiers(&BearerSecurity),
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = OAUTH_TAG, description = "Authorization, token and introspection endpoints"),
        (name = AUTH_TAG, description = "User registration and logout"),
        (name = PROFILE_TAG, description = "Resources guarded by bearer tokens"),
    ),
    info(
        title = "OAuth 2.0 Authorization Server",
        description = "Issues and validates OAuth 2.0 access and refresh tokens",
        version = "1.0.0"
    )
)]
pub(crate) struct ApiDoc;

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi
            .components
            .get_or_insert_with(Default::default)
            .add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
    }
}
