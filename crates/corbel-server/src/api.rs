//! HTTP API: audit page, JSON audit endpoint, health checks and Prometheus metrics

use crate::page::{self, PageOutcome};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use corbel_lib::{
    health::{ComponentStatus, HealthRegistry},
    AuditError, AuditMetrics, AuditReport, AuditRequest, AuditService, DesignParameters,
    ParameterSpec, PARAMETER_SPECS,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: AuditService,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(service: AuditService, health_registry: HealthRegistry) -> Self {
        Self {
            service,
            health_registry,
        }
    }
}

/// Error body of the JSON API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Failed JSON API call
pub enum ApiError {
    Audit(AuditError),
    /// Body could not be decoded into an `AuditRequest`
    Body(JsonRejection),
}

impl From<AuditError> for ApiError {
    fn from(e: AuditError) -> Self {
        ApiError::Audit(e)
    }
}

/// Missing or mistyped fields are parameter errors; anything else is a bad request
fn body_error_code(rejection: &JsonRejection) -> &'static str {
    match rejection {
        JsonRejection::JsonDataError(_) => "invalid_parameter",
        _ => "invalid_request",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Audit(e) => {
                let status = match e {
                    AuditError::MissingCredential | AuditError::InvalidParameter(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    AuditError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let body = ErrorResponse {
                    error: e.to_string(),
                    code: e.code().to_string(),
                };
                (status, body)
            }
            ApiError::Body(rejection) => {
                let status = match &rejection {
                    JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    _ => rejection.status(),
                };
                let body = ErrorResponse {
                    error: rejection.body_text(),
                    code: body_error_code(&rejection).to_string(),
                };
                (status, body)
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Fields posted by the page form
#[derive(Debug, Deserialize)]
pub struct AuditForm {
    pub fc: f64,
    pub b: f64,
    pub d: f64,
    pub a: f64,
    pub rho: f64,
    #[serde(default)]
    pub api_key: String,
}

impl AuditForm {
    fn parameters(&self) -> DesignParameters {
        DesignParameters {
            fc: self.fc,
            b: self.b,
            d: self.d,
            a: self.a,
            rho: self.rho,
        }
    }
}

async fn index() -> Html<String> {
    Html(page::render(&DesignParameters::default(), PageOutcome::Empty))
}

/// Form submission; always re-renders the page
async fn submit_form(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AuditForm>,
) -> impl IntoResponse {
    let parameters = form.parameters();
    let request = AuditRequest {
        parameters,
        api_key: Some(form.api_key),
    };

    match state.service.run(&request).await {
        Ok(report) => (
            StatusCode::OK,
            Html(page::render(&parameters, PageOutcome::Report(&report))),
        ),
        Err(e) => {
            let status = match e {
                AuditError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::OK,
            };
            (
                status,
                Html(page::render(&parameters, PageOutcome::Error(e.to_string()))),
            )
        }
    }
}

async fn api_audit(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AuditRequest>, JsonRejection>,
) -> Result<Json<AuditReport>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        AuditMetrics::new().inc_rejected_requests(body_error_code(&rejection));
        ApiError::Body(rejection)
    })?;
    Ok(Json(state.service.run(&request).await?))
}

async fn parameters() -> Json<&'static [ParameterSpec]> {
    let specs: &'static [ParameterSpec] = &PARAMETER_SPECS;
    Json(specs)
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Predictions still served
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/audit", post(submit_form))
        .route("/api/v1/audit", post(api_audit))
        .route("/api/v1/parameters", get(parameters))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
