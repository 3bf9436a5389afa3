use crate::errors::ApiError;
use axum::extract::{Form, FromRequest, Request};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use serde::de::DeserializeOwned;

/// Body extractor accepting `application/json` or `application/x-www-form-urlencoded`.
/// Anything that is not JSON is parsed as a form.
pub struct FormOrJson<T>(pub T);

impl<S, T> FromRequest<S> for FormOrJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            match Json::<T>::from_request(req, state).await {
                Ok(Json(value)) => Ok(Self(value)),
                Err(rejection) => {
                    debug!("Rejected JSON body: {}", rejection.body_text());
                    Err(ApiError::invalid_request(rejection.body_text()))
                }
            }
        } else {
            match Form::<T>::from_request(req, state).await {
                Ok(Form(value)) => Ok(Self(value)),
                Err(rejection) => {
                    debug!("Rejected form body: {}", rejection.body_text());
                    Err(ApiError::invalid_request(rejection.body_text()))
                }
            }
        }
    }
}

/// `(client_id, client_secret)` from an `Authorization: Basic` header, if present and well formed
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (client_id, client_secret) = decoded.split_once(':')?;
    Some((client_id.to_string(), client_secret.to_string()))
}
