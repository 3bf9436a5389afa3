use log::{debug, info, warn};
use subtle::ConstantTimeEq;
use url::{Url, form_urlencoded};

use super::GrantEngine;
use crate::clock::{expires_after, new_id, random_token};
use crate::error::GrantError;
use crate::models::{AuthorizationCode, Credential};
use crate::pkce::CodeChallengeMethod;
use crate::scope;
use crate::store::Store;

/// Authorization endpoint input.
///
/// `provision_key` and `authenticated_userid` are supplied by the trusted gateway
/// that already authenticated the end user.
#[derive(Clone, Default)]
pub struct AuthorizeRequest {
    pub response_type: Option<String>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<String>,
    pub provision_key: Option<String>,
    pub authenticated_userid: Option<String>,
}

/// How a failed authorization request must be reported
#[derive(Debug)]
pub enum AuthorizeRejection {
    /// Send the client to its verified redirect URI with `error` query parameters
    Redirect { location: Url, error: GrantError },
    /// No verified redirect target exists. Report the error directly.
    Direct(GrantError),
}

impl AuthorizeRejection {
    pub fn error(&self) -> &GrantError {
        match self {
            AuthorizeRejection::Redirect { error, .. } => error,
            AuthorizeRejection::Direct(error) => error,
        }
    }
}

impl<S: Store> GrantEngine<S> {
    /// Handle an authorization request, returning the redirect location on success.
    ///
    /// The provision key, client and redirect URI are checked first and failures there
    /// are reported directly. Anything after that is delivered through the redirect.
    pub async fn authorize(&self, request: AuthorizeRequest) -> Result<Url, AuthorizeRejection> {
        if !self.provision_key_matches(request.provision_key.as_deref()) {
            warn!("Authorization request with an invalid provision key");
            return Err(AuthorizeRejection::Direct(GrantError::InvalidProvisionKey));
        }

        let Some(client_id) = non_empty(&request.client_id) else {
            return Err(AuthorizeRejection::Direct(GrantError::InvalidRequest(
                "client_id is required".into(),
            )));
        };
        let credential = self
            .core
            .store
            .find_credential_by_client_id(client_id)
            .await
            .map_err(|e| AuthorizeRejection::Direct(e.into()))?
            .ok_or_else(|| {
                warn!("Authorization request for unknown client '{}'", client_id);
                AuthorizeRejection::Direct(GrantError::InvalidClient("invalid client".into()))
            })?;

        let redirect_uri = non_empty(&request.redirect_uri)
            .filter(|uri| credential.allows_redirect(uri))
            .ok_or_else(|| {
                warn!("Unregistered redirect_uri for client '{}'", client_id);
                AuthorizeRejection::Direct(GrantError::InvalidRequest(
                    "invalid redirect_uri".into(),
                ))
            })?;
        let redirect = Url::parse(redirect_uri).map_err(|_| {
            AuthorizeRejection::Direct(GrantError::InvalidRequest("invalid redirect_uri".into()))
        })?;

        match self
            .dispatch_response_type(&request, &credential, redirect_uri, redirect.clone())
            .await
        {
            Ok(location) => Ok(location),
            Err(error) => {
                warn!(
                    "Authorization request from client '{}' rejected: {} ({})",
                    client_id,
                    error.code(),
                    error
                );
                let location = error_redirect(redirect, &error, non_empty(&request.state));
                Err(AuthorizeRejection::Redirect { location, error })
            }
        }
    }

    fn provision_key_matches(&self, presented: Option<&str>) -> bool {
        presented.is_some_and(|key| {
            key.as_bytes()
                .ct_eq(self.core.settings.provision_key.as_bytes())
                .into()
        })
    }

    async fn dispatch_response_type(
        &self,
        request: &AuthorizeRequest,
        credential: &Credential,
        redirect_uri: &str,
        redirect: Url,
    ) -> Result<Url, GrantError> {
        let response_type = request.response_type.as_deref().unwrap_or_default();
        match response_type {
            "code" | "token" => {}
            "" => return Err(GrantError::InvalidRequest("response_type is required".into())),
            other => return Err(GrantError::UnsupportedResponseType(other.to_string())),
        }

        let user_id = non_empty(&request.authenticated_userid).ok_or_else(|| {
            GrantError::InvalidRequest("authenticated_userid is required".into())
        })?;
        let scopes = scope::parse(request.scope.as_deref())?;

        if response_type == "code" {
            self.issue_code(request, credential, user_id, scopes, redirect_uri, redirect)
                .await
        } else {
            self.issue_implicit_token(request, credential, user_id, scopes, redirect)
                .await
        }
    }

    async fn issue_code(
        &self,
        request: &AuthorizeRequest,
        credential: &Credential,
        user_id: &str,
        scopes: Vec<String>,
        redirect_uri: &str,
        mut redirect: Url,
    ) -> Result<Url, GrantError> {
        let settings = &self.core.settings;
        if !settings.enable_authorization_code {
            return Err(GrantError::ResponseTypeDisabled("authorization code flow"));
        }

        let (code_challenge, code_challenge_method) = if settings.enable_pkce {
            let challenge = non_empty(&request.code_challenge).map(str::to_string);
            let method = match non_empty(&request.code_challenge_method) {
                Some(method) => method.parse::<CodeChallengeMethod>()?,
                None => CodeChallengeMethod::default(),
            };
            if challenge.is_none() && settings.pkce_required {
                return Err(GrantError::InvalidRequest(
                    "code_challenge is required".into(),
                ));
            }
            let method = challenge.as_ref().map(|_| method);
            (challenge, method)
        } else {
            if request.code_challenge.is_some() {
                debug!("PKCE is disabled, ignoring code_challenge");
            }
            (None, None)
        };

        let now = self.core.now();
        let code = AuthorizationCode {
            id: new_id(),
            code: random_token(),
            client_id: credential.client_id.clone(),
            user_id: user_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            scopes,
            code_challenge,
            code_challenge_method,
            expires_at: expires_after(now, settings.auth_code_ttl),
            used: false,
            created_at: now,
        };
        self.core
            .store
            .insert_authorization_code(code.clone())
            .await?;

        info!(
            "Issued authorization code to client '{}' for user {}",
            credential.client_id, user_id
        );

        {
            let mut query = redirect.query_pairs_mut();
            query.append_pair("code", &code.code);
            if let Some(state) = non_empty(&request.state) {
                query.append_pair("state", state);
            }
        }
        Ok(redirect)
    }

    async fn issue_implicit_token(
        &self,
        request: &AuthorizeRequest,
        credential: &Credential,
        user_id: &str,
        scopes: Vec<String>,
        mut redirect: Url,
    ) -> Result<Url, GrantError> {
        if !self.core.settings.enable_implicit_grant {
            return Err(GrantError::ResponseTypeDisabled("implicit grant"));
        }

        let token = self
            .core
            .issue_token(
                credential,
                Some(user_id.to_string()),
                scope::join(&scopes),
                false,
            )
            .await?;
        let expires_in = (token.access_expires_at - self.core.now()).num_seconds();

        info!(
            "Issued implicit token to client '{}' for user {}",
            credential.client_id, user_id
        );

        // Fragments are not sent to servers when the browser follows the redirect
        let mut fragment = form_urlencoded::Serializer::new(String::new());
        fragment
            .append_pair("access_token", &token.access_token)
            .append_pair("token_type", "bearer")
            .append_pair("expires_in", &expires_in.to_string());
        if !token.scope.is_empty() {
            fragment.append_pair("scope", &token.scope);
        }
        if let Some(state) = non_empty(&request.state) {
            fragment.append_pair("state", state);
        }
        redirect.set_fragment(Some(&fragment.finish()));
        Ok(redirect)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn error_redirect(mut redirect: Url, error: &GrantError, state: Option<&str>) -> Url {
    {
        let mut query = redirect.query_pairs_mut();
        query
            .append_pair("error", error.code().as_str())
            .append_pair("error_description", &error.description());
        if let Some(state) = state {
            query.append_pair("state", state);
        }
    }
    redirect
}
