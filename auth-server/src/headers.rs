use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};

/// Cache-Control directives
#[derive(Debug, Clone, Default)]
pub struct CacheControl {
    pub no_store: bool,
}

impl CacheControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_store(mut self) -> Self {
        self.no_store = true;
        self
    }

    /// Convert to HeaderValue
    pub fn to_header_value(&self) -> HeaderValue {
        if self.no_store {
            HeaderValue::from_static("no-store")
        } else {
            HeaderValue::from_static("no-cache")
        }
    }

    /// Apply headers to a response
    pub fn apply<B>(&self, response: &mut Response<B>) {
        let headers = response.headers_mut();
        headers.insert(CACHE_CONTROL, self.to_header_value());
        if self.no_store {
            // HTTP/1.0 caches only understand Pragma
            headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
            headers.insert(EXPIRES, HeaderValue::from_static("0"));
        }
    }
}

/// Common cache header presets
pub mod presets {
    use super::*;

    /// Responses carrying tokens or credentials (RFC 6749 Section 5.1)
    pub fn no_store() -> CacheControl {
        CacheControl::new().no_store()
    }

    /// Wrap any response so it is never cached
    pub fn uncached(response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        no_store().apply(&mut response);
        response
    }
}
