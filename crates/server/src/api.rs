//! HTTP API for chaos usage reports, ingestion, health checks and metrics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chaos_lib::{
    health::{ComponentStatus, HealthRegistry},
    ChaosError, ChaosUsageService, RawSample, RegistrationRequest, ReportKind, ResourceId,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: ChaosUsageService,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(service: ChaosUsageService, health_registry: HealthRegistry) -> Self {
        Self {
            service,
            health_registry,
        }
    }
}

/// Maps library errors onto HTTP status codes
pub struct ApiError(pub ChaosError);

impl From<ChaosError> for ApiError {
    fn from(err: ChaosError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let retryable = err.is_retryable();
        let status = match &err {
            ChaosError::NotFound(_) => StatusCode::NOT_FOUND,
            ChaosError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ChaosError::EmptySampleSet { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ChaosError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ChaosError::PartialIngestionFailure { .. } if retryable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ChaosError::PartialIngestionFailure { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ChaosError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut body = json!({
            "error": err.to_string(),
            "retryable": retryable,
        });
        if let ChaosError::PartialIngestionFailure { written, .. } = &err {
            body["written"] = json!(written);
        }

        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Sample batch as posted by the usage collector
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub items: Vec<RawSample>,
}

#[derive(Debug, Deserialize)]
pub struct ResourceQuery {
    /// Comma separated resource ids
    pub ids: String,
}

#[derive(Debug, Deserialize)]
pub struct NamespaceQuery {
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "default".to_string()
}

async fn register_experiment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegistrationRequest>,
) -> ApiResult<impl IntoResponse> {
    let registration = state.service.register_experiment(&request).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

async fn delete_experiment(
    State(state): State<Arc<AppState>>,
    Path(chaos_name): Path<String>,
    Query(query): Query<NamespaceQuery>,
) -> ApiResult<StatusCode> {
    state
        .service
        .delete_experiment(&chaos_name, &query.namespace)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn resources_by_ids(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResourceQuery>,
) -> ApiResult<impl IntoResponse> {
    let ids = parse_ids(&query.ids)?;
    let resources = state.service.resources_by_ids(&ids).await?;
    Ok(Json(resources))
}

fn parse_ids(raw: &str) -> Result<Vec<ResourceId>, ChaosError> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<ResourceId>()
                .map_err(|_| ChaosError::InvalidRequest(format!("invalid resource id '{}'", id)))
        })
        .collect()
}

async fn ingest_samples(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IngestRequest>,
) -> ApiResult<impl IntoResponse> {
    let summary = state.service.ingest(&request.items).await?;
    Ok(Json(summary))
}

async fn report(state: &AppState, kind: ReportKind, chaos_name: &str) -> ApiResult<Response> {
    let report = state.service.report(kind, chaos_name).await?;
    Ok(Json(report).into_response())
}

async fn usage_by_pod(
    State(state): State<Arc<AppState>>,
    Path(chaos_name): Path<String>,
) -> ApiResult<Response> {
    report(&state, ReportKind::ByPod, &chaos_name).await
}

async fn usage_by_workload(
    State(state): State<Arc<AppState>>,
    Path(chaos_name): Path<String>,
) -> ApiResult<Response> {
    report(&state, ReportKind::ByWorkload, &chaos_name).await
}

async fn usage_by_node(
    State(state): State<Arc<AppState>>,
    Path(chaos_name): Path<String>,
) -> ApiResult<Response> {
    report(&state, ReportKind::ByNode, &chaos_name).await
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
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

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %err, "Failed to encode metrics");
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
        .route("/chaos", post(register_experiment))
        .route("/chaos/resources", get(resources_by_ids))
        .route("/chaos/usage", post(ingest_samples))
        .route("/chaos/:chaos_name", axum::routing::delete(delete_experiment))
        .route("/chaos/:chaos_name/usage/pods", get(usage_by_pod))
        .route("/chaos/:chaos_name/usage/workloads", get(usage_by_workload))
        .route("/chaos/:chaos_name/usage/nodes", get(usage_by_node))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
