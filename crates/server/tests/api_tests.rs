//! Integration tests for the chaos usage API endpoints

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chaos_lib::{
    health::{components, HealthRegistry},
    AlignmentConfig, ChaosUsageService, MemoryStore, StructuredLogger,
};
use chaos_usage_server::api::{create_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn setup_test_app() -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::STORE).await;
    health_registry.register(components::INGESTION).await;

    let service = ChaosUsageService::new(
        Arc::new(MemoryStore::new()),
        AlignmentConfig::default(),
        health_registry.clone(),
        StructuredLogger::new("api-test"),
    );
    let state = Arc::new(AppState::new(service, health_registry));
    let router = create_router(state.clone());

    (router, state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

/// Registers `exp1` with one selected pod, one other pod of the same
/// workload and one node; returns their ids in that order
async fn register_exp1(app: &Router) -> Vec<i64> {
    let (status, body) = send(
        app,
        Method::POST,
        "/chaos",
        Some(json!({
            "stressChaos": {
                "chaosName": "exp1",
                "namespace": "default",
                "creationTime": "2024-09-12T10:00:00",
                "endTime": "2024-09-12T10:01:00",
                "duration": "60s"
            },
            "chaosResource": [
                {"resourceName": "web-abc", "type": "pod", "generatedName": "web-", "selected": true},
                {"resourceName": "web-def", "type": "pod", "generatedName": "web-", "selected": false},
                {"resourceName": "worker-1", "type": "node"}
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    body["resourceIds"]
        .as_array()
        .unwrap()
        .iter()
        .map(|id| id.as_i64().unwrap())
        .collect()
}

fn usage(resource_id: i64, time: &str, cpu: i64, memory: i64) -> Value {
    json!({
        "resourceId": resource_id,
        "measurementTime": time,
        "cpu": cpu,
        "memory": memory,
        "appStatus": 1
    })
}

#[tokio::test]
async fn test_register_then_lookup_resources() {
    let (app, _state) = setup_test_app().await;
    let ids = register_exp1(&app).await;

    let uri = format!("/chaos/resources?ids={},{}", ids[0], ids[2]);
    let (status, body) = send(&app, Method::GET, &uri, None).await;

    assert_eq!(status, StatusCode::OK);
    let resources = body.as_array().unwrap();
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0]["resourceName"], "web-abc");
    assert_eq!(resources[0]["type"], "pod");
    assert_eq!(resources[1]["type"], "node");
}

#[tokio::test]
async fn test_duplicate_registration_is_bad_request() {
    let (app, _state) = setup_test_app().await;
    register_exp1(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/chaos",
        Some(json!({
            "stressChaos": {
                "chaosName": "exp1",
                "namespace": "default",
                "creationTime": "2024-09-12T10:00:00"
            }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_pod_report_fills_gaps_with_sentinel() {
    let (app, _state) = setup_test_app().await;
    let ids = register_exp1(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/chaos/usage",
        Some(json!({
            "items": [
                usage(ids[0], "2024-09-12T10:00:00", 100, 1000),
                usage(ids[0], "2024-09-12T10:00:10", 110, 1100),
                usage(ids[0], "2024-09-12T10:00:20", 120, 1200)
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["written"], 3);

    let (status, body) = send(&app, Method::GET, "/chaos/exp1/usage/pods", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "byPod");
    assert_eq!(body["time"][0], "2024-09-12T10:00:00");
    assert_eq!(body["time"][5], "2024-09-12T10:00:50");
    let item = &body["items"][0];
    assert_eq!(item["resourceLabel"], "web-abc");
    assert_eq!(item["alignment"], "synthesized");
    assert_eq!(item["cpu"], json!([100, 110, 120, -1, -1, -1]));
    assert_eq!(item["appStatus"], json!([1, 1, 1, -1, -1, -1]));
}

#[tokio::test]
async fn test_workload_and_node_reports() {
    let (app, _state) = setup_test_app().await;
    let ids = register_exp1(&app).await;

    let mut items = vec![
        usage(ids[0], "2024-09-12T10:00:00", 10, 100),
        usage(ids[1], "2024-09-12T10:00:00", 30, 300),
    ];
    for (i, time) in [
        "2024-09-12T10:00:50",
        "2024-09-12T10:00:00",
        "2024-09-12T10:00:10",
        "2024-09-12T10:00:20",
        "2024-09-12T10:00:30",
        "2024-09-12T10:00:40",
    ]
    .iter()
    .enumerate()
    {
        items.push(usage(ids[2], time, i as i64, i as i64));
    }
    let (status, _) = send(&app, Method::POST, "/chaos/usage", Some(json!({ "items": items }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/chaos/exp1/usage/workloads", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["resourceLabel"], "web-");
    assert_eq!(body["items"][0]["cpu"][0], 20);
    assert!(body["items"][0].get("appStatus").is_none());

    let (status, body) = send(&app, Method::GET, "/chaos/exp1/usage/nodes", None).await;
    assert_eq!(status, StatusCode::OK);
    let node = &body["items"][0];
    assert_eq!(node["alignment"], "exact");
    assert_eq!(node["timeAxis"][0], "2024-09-12T10:00:50");
    assert_eq!(node["cpu"], json!([0, 1, 2, 3, 4, 5]));
}

#[tokio::test]
async fn test_report_for_unknown_experiment_is_404() {
    let (app, _state) = setup_test_app().await;

    let (status, body) = send(&app, Method::GET, "/chaos/missing/usage/nodes", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_report_with_sampleless_resource_is_422() {
    let (app, _state) = setup_test_app().await;
    register_exp1(&app).await;

    let (status, body) = send(&app, Method::GET, "/chaos/exp1/usage/nodes", None).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("worker-1"));
}

#[tokio::test]
async fn test_partial_ingestion_reports_written_count() {
    let (app, state) = setup_test_app().await;
    let ids = register_exp1(&app).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/chaos/usage",
        Some(json!({
            "items": [
                usage(ids[2], "2024-09-12T10:00:00", 1, 1),
                usage(9999, "2024-09-12T10:00:00", 1, 1),
                usage(ids[2], "2024-09-12T10:00:10", 2, 2)
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["written"], 1);

    let health = state.health_registry.health().await;
    assert_eq!(health.status, chaos_lib::ComponentStatus::Degraded);
}

#[tokio::test]
async fn test_delete_experiment() {
    let (app, _state) = setup_test_app().await;
    register_exp1(&app).await;

    let (status, _) = send(&app, Method::DELETE, "/chaos/exp1?namespace=default", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::DELETE, "/chaos/exp1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_readyz_returns_503_until_ready() {
    let (app, state) = setup_test_app().await;

    let (status, body) = send(&app, Method::GET, "/readyz", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);

    state.health_registry.set_ready(true).await;
    let (status, body) = send(&app, Method::GET, "/readyz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app().await;

    let (status, body) = send(&app, Method::GET, "/healthz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    state
        .health_registry
        .set_unhealthy(components::STORE, "database unreachable")
        .await;
    let (status, body) = send(&app, Method::GET, "/healthz", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_report_counters() {
    let (app, _state) = setup_test_app().await;
    send(&app, Method::GET, "/chaos/missing/usage/pods", None).await;

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("chaos_usage_reports_failed_total"));
}
