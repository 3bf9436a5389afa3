use crate::api::oauth::models::TokenResponse;
use crate::config::AuthServerConfig;
use crate::create_app;
use crate::state::tests::create_test_state;
use crate::state::AppState;
use axum::body::Body;
use axum::Router;
use http::header::{AsHeaderName, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use log::LevelFilter;
use oauth_engine::credentials::{provision_client, register_user, NewClient, NewUser};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_CLIENT_ID: &str = "web-app";
pub const TEST_CLIENT_SECRET: &str = "web-secret";
pub const TEST_REDIRECT_URI: &str = "https://app.example.com/callback";

/// Test fixture wrapping the full application router over an in-memory store.
///
/// Requests go through `tower::ServiceExt::oneshot`, no socket is opened.
///
/// # Examples
///
/// ```rust
/// #[tokio::test]
/// async fn test_endpoint() {
///     let fixture = TestFixture::with_client().await;
///     let token = fixture.client_credentials_token().await;
///
///     let response = fixture.get_with_token("/api/v1/profile", &token).await;
///     response.assert_ok();
/// }
/// ```
pub struct TestFixture {
    /// The application router
    pub app: Router,
    /// Shared state, for seeding data directly into the store
    pub state: AppState,
}

impl TestFixture {
    /// Creates a fixture with the test configuration and an empty store
    pub async fn new() -> Self {
        Self::with_config(AuthServerConfig::for_test()).await
    }

    pub async fn with_config(config: AuthServerConfig) -> Self {
        Self::setup_logger(LevelFilter::Debug);
        let state = create_test_state(config);
        let app = create_app(state.clone()).await;
        Self { app, state }
    }

    /// Creates a fixture with the `web-app` client already provisioned
    pub async fn with_client() -> Self {
        let fixture = Self::new().await;
        fixture.provision_web_client().await;
        fixture
    }

    pub fn setup_logger(level: LevelFilter) {
        let _ = env_logger::builder()
            .filter_level(level)
            .is_test(true)
            .try_init();
    }

    /// Provision `web-app` / `web-secret` with the test redirect URI
    pub async fn provision_web_client(&self) {
        provision_client(
            self.state.store(),
            "acme",
            "acme-id",
            NewClient {
                name: "Web App".to_string(),
                client_id: Some(TEST_CLIENT_ID.to_string()),
                client_secret: Some(TEST_CLIENT_SECRET.to_string()),
                redirect_uris: vec![TEST_REDIRECT_URI.to_string()],
            },
        )
        .await
        .expect("Failed to provision test client");
    }

    pub async fn register_user(&self, email: &str, username: &str, password: &str) {
        register_user(
            self.state.store(),
            self.state.engine.password_hasher(),
            NewUser {
                email: email.to_string(),
                username: username.to_string(),
                name: username.to_string(),
                password: password.to_string(),
            },
        )
        .await
        .expect("Failed to register test user");
    }

    /// Obtain a machine token for the test client
    pub async fn client_credentials_token(&self) -> String {
        let response = self
            .post_form(
                "/oauth2/token",
                &[
                    ("grant_type", "client_credentials"),
                    ("client_id", TEST_CLIENT_ID),
                    ("client_secret", TEST_CLIENT_SECRET),
                ],
            )
            .await;
        response.assert_ok();
        response.json_as::<TokenResponse>().access_token
    }

    pub fn request_builder(&self, method: Method, uri: impl AsRef<str>) -> http::request::Builder {
        Request::builder().method(method).uri(uri.as_ref())
    }

    pub async fn get(&self, uri: impl AsRef<str>) -> TestResponse {
        let request = self
            .request_builder(Method::GET, uri)
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn get_with_token(&self, uri: impl AsRef<str>, token: &str) -> TestResponse {
        let request = self
            .request_builder(Method::GET, uri)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn post_json<T: Serialize>(&self, uri: impl AsRef<str>, body: &T) -> TestResponse {
        let json_body = serde_json::to_vec(body).expect("Failed to serialize body to JSON");
        let request = self
            .request_builder(Method::POST, uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json_body))
            .expect("Failed to build request");
        self.send(request).await
    }

    /// POST an `application/x-www-form-urlencoded` body
    pub async fn post_form(&self, uri: impl AsRef<str>, fields: &[(&str, &str)]) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = self
            .request_builder(Method::POST, uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn post_with_token(&self, uri: impl AsRef<str>, token: &str) -> TestResponse {
        let request = self
            .request_builder(Method::POST, uri)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("Failed to build request");
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read response body")
            .to_bytes();

        // Try to parse as JSON, defaulting to empty object if parsing fails or empty body
        let json = if !body.is_empty() {
            serde_json::from_slice(&body).unwrap_or_else(|_| serde_json::json!({}))
        } else {
            serde_json::json!({})
        };

        TestResponse {
            status,
            headers,
            json,
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: Value,
}

impl TestResponse {
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {} but got {} with body: {}",
            expected,
            self.status,
            serde_json::to_string_pretty(&self.json).unwrap_or_default()
        );
        self
    }

    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    pub fn json(&self) -> &Value {
        &self.json
    }

    pub fn json_as<T: DeserializeOwned>(&self) -> T {
        serde_json::from_value(self.json.clone()).expect("Failed to deserialize response JSON")
    }

    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
