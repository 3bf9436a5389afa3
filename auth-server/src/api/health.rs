use crate::openapi::HEALTH_TAG;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub(crate) const SERVICE_NAME: &str = "oauth2-authorization-server";

/// Represents the health status of a component or the overall service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum HealthStatusType {
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "error")]
    Error,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatusType,
    pub service: String,
    /// RFC 3339 time of the check
    pub timestamp: String,
    pub store: StoreStatus,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StoreStatus {
    pub status: HealthStatusType,
    /// Configured backend, `in-memory` or `redis`
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        let status_code = match self.status {
            HealthStatusType::Ok => StatusCode::OK,
            HealthStatusType::Error => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status_code, Json(self)).into_response()
    }
}

async fn check_health(state: &AppState) -> HealthResponse {
    let store = match state.health_check().await {
        Ok(()) => {
            debug!("Health check passed");
            StoreStatus {
                status: HealthStatusType::Ok,
                backend: state.config.store.backend.to_string(),
                error: None,
            }
        }
        Err(e) => {
            warn!("Health check failed: store: {}", e);
            StoreStatus {
                status: HealthStatusType::Error,
                backend: state.config.store.backend.to_string(),
                error: Some(e),
            }
        }
    };

    HealthResponse {
        status: store.status,
        service: SERVICE_NAME.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        store,
    }
}

/// Health check handler
#[utoipa::path(
    get,
    path = "/health",
    tag = HEALTH_TAG,
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Store is unreachable", body = HealthResponse)
    )
)]
async fn health_check(State(state): State<AppState>) -> HealthResponse {
    check_health(&state).await
}

/// Ready check handler - alias to health check
#[utoipa::path(
    get,
    path = "/ready",
    tag = HEALTH_TAG,
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse),
        (status = 503, description = "Service is not ready", body = HealthResponse)
    )
)]
async fn ready_check(State(state): State<AppState>) -> HealthResponse {
    check_health(&state).await
}

pub(super) fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(health_check))
        .routes(routes!(ready_check))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::TestFixture;

    #[tokio::test]
    async fn test_health_endpoints() {
        let fixture = TestFixture::new().await;

        for path in ["/health", "/ready"] {
            let response = fixture.get(path).await;
            response.assert_ok();
            let health = response.json_as::<HealthResponse>();
            assert_eq!(health.status, HealthStatusType::Ok);
            assert_eq!(health.service, SERVICE_NAME);
            assert_eq!(health.store.backend, "in-memory");
            assert!(health.store.error.is_none());
        }
    }

    #[test]
    fn test_unhealthy_response_status() {
        let response = HealthResponse {
            status: HealthStatusType::Error,
            service: SERVICE_NAME.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            store: StoreStatus {
                status: HealthStatusType::Error,
                backend: "redis".to_string(),
                error: Some("connection refused".to_string()),
            },
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
