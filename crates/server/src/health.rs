use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    capability_groups: usize,
    generation_backend: String,
    started_at: DateTime<Utc>,
}

impl HealthState {
    pub fn new(capability_groups: usize, generation_backend: impl Into<String>) -> Self {
        Self { capability_groups, generation_backend: generation_backend.into(), started_at: Utc::now() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub status: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub capabilities: HealthCheck,
    pub generation_backend: HealthCheck,
    pub started_at: String,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/", get(root)).route("/health", get(health)).with_state(state)
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse { message: "Welcome to GP Portfolio API", status: "running" })
}

/// Readiness only: the generation backend is reported as configured, never
/// called, so a health check costs no tokens.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let capabilities = if state.capability_groups > 0 {
        HealthCheck {
            status: "ready",
            detail: format!("{} capability groups loaded", state.capability_groups),
        }
    } else {
        HealthCheck { status: "degraded", detail: "no capability groups loaded".to_string() }
    };
    let ready = capabilities.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "gpfolio-server runtime initialized".to_string(),
        },
        capabilities,
        generation_backend: HealthCheck {
            status: "configured",
            detail: state.generation_backend.clone(),
        },
        started_at: state.started_at.to_rfc3339(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};

    use crate::health::{health, root, HealthState};

    #[tokio::test]
    async fn root_reports_running() {
        let Json(payload) = root().await;
        assert_eq!(payload.message, "Welcome to GP Portfolio API");
        assert_eq!(payload.status, "running");
    }

    #[tokio::test]
    async fn health_returns_ready_when_taxonomy_is_loaded() {
        let state = HealthState::new(13, "https://api.openai.com/v1 (gpt-4)");

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.capabilities.detail, "13 capability groups loaded");
        assert_eq!(payload.generation_backend.status, "configured");
        assert_eq!(payload.generation_backend.detail, "https://api.openai.com/v1 (gpt-4)");
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_without_capabilities() {
        let (status, Json(payload)) = health(State(HealthState::new(0, "http://localhost"))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.capabilities.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }
}
