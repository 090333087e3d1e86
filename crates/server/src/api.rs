//! JSON API consumed by the portfolio frontend.
//!
//! - `POST /api/generate-review`  generate a structured case review
//! - `POST /api/improve-review`   rework an existing review per instruction
//! - `GET  /api/capabilities`     capability taxonomy as an ordered object
//!
//! Every failure is returned as [`ErrorResponse`] with the correlation id that
//! tags the request's log lines.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use gpfolio_agent::ReviewRuntime;
use gpfolio_core::{
    ApplicationError, CapabilityTaxonomy, CaseReviewRequest, CaseReviewResult, ImprovementRequest,
    InterfaceError,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::bootstrap::Application;
use crate::health::{self, HealthState};

#[derive(Clone)]
pub struct ApiState {
    runtime: Arc<ReviewRuntime>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: bool,
    pub message: String,
    pub correlation_id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CapabilitiesResponse {
    pub capabilities: CapabilityTaxonomy,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("allowed origin `{0}` is not a valid header value")]
    InvalidOrigin(String),
}

pub fn router(runtime: Arc<ReviewRuntime>) -> Router {
    Router::new()
        .route("/api/generate-review", post(generate_review))
        .route("/api/improve-review", post(improve_review))
        .route("/api/capabilities", get(capabilities))
        .with_state(ApiState { runtime })
}

/// Full service: health routes, API routes and the CORS policy.
pub fn app(application: &Application) -> Result<Router, RouterError> {
    let llm = &application.config.llm;
    let health_state = HealthState::new(
        application.runtime.capabilities().len(),
        format!("{} ({})", llm.base_url, llm.model),
    );
    let cors = cors_layer(&application.config.server.allowed_origins)?;

    Ok(Router::new()
        .merge(health::router(health_state))
        .merge(router(application.runtime.clone()))
        .layer(cors))
}

/// Explicit origins with credentials. Methods and headers mirror the
/// preflight request since wildcards cannot be combined with credentials.
pub fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer, RouterError> {
    let origins = allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| RouterError::InvalidOrigin(origin.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

async fn generate_review(
    State(state): State<ApiState>,
    payload: Result<Json<CaseReviewRequest>, JsonRejection>,
) -> Result<Json<CaseReviewResult>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let Json(request) = payload.map_err(|rejection| rejected(rejection, &correlation_id))?;

    let span = info_span!("api.generate_review", correlation_id = %correlation_id);
    async {
        info!(event_name = "api.review.generate.received", "generate review request received");
        state
            .runtime
            .generate_case_review(&request)
            .await
            .map(Json)
            .map_err(|error| failure(error, &correlation_id))
    }
    .instrument(span)
    .await
}

async fn improve_review(
    State(state): State<ApiState>,
    payload: Result<Json<ImprovementRequest>, JsonRejection>,
) -> Result<Json<CaseReviewResult>, ApiError> {
    let correlation_id = Uuid::new_v4().to_string();
    let Json(request) = payload.map_err(|rejection| rejected(rejection, &correlation_id))?;

    let span = info_span!("api.improve_review", correlation_id = %correlation_id);
    async {
        info!(event_name = "api.review.improve.received", "improve review request received");
        state
            .runtime
            .improve_case_review(&request)
            .await
            .map(Json)
            .map_err(|error| failure(error, &correlation_id))
    }
    .instrument(span)
    .await
}

async fn capabilities(State(state): State<ApiState>) -> Json<CapabilitiesResponse> {
    Json(CapabilitiesResponse { capabilities: state.runtime.capabilities().clone() })
}

fn rejected(rejection: JsonRejection, correlation_id: &str) -> ApiError {
    warn!(
        event_name = "api.request.rejected",
        correlation_id = %correlation_id,
        status = rejection.status().as_u16(),
        "request body rejected"
    );
    (
        rejection.status(),
        Json(ErrorResponse {
            error: true,
            message: rejection.body_text(),
            correlation_id: correlation_id.to_string(),
        }),
    )
}

fn failure(error: ApplicationError, correlation_id: &str) -> ApiError {
    let interface = error.into_interface(correlation_id);
    let (status, message) = match &interface {
        InterfaceError::BadRequest { message, .. } => {
            warn!(event_name = "api.request.invalid", error = %message, "request failed validation");
            (StatusCode::BAD_REQUEST, message.clone())
        }
        InterfaceError::ServiceUnavailable { message, .. } => {
            error!(event_name = "api.request.backend_unavailable", error = %message, "generation backend failed");
            (StatusCode::SERVICE_UNAVAILABLE, interface.user_message().to_string())
        }
        InterfaceError::Internal { message, .. } => {
            error!(event_name = "api.request.internal_error", error = %message, "request failed internally");
            (StatusCode::INTERNAL_SERVER_ERROR, interface.user_message().to_string())
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: true,
            message,
            correlation_id: interface.correlation_id().to_string(),
        }),
    )
}
