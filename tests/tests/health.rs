//! Tests for health check endpoints.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::setup::TestContext;
use pipeline_core::RelayVariant;
use telemetry::health;

/// Test /health endpoint returns proper structure
#[tokio::test]
async fn test_health_endpoint_structure() {
    let ctx = TestContext::new(RelayVariant::Temperature);
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert!(body.get("status").is_some(), "Response should have 'status' field");
    assert!(
        body.get("redpanda_connected").is_some(),
        "Response should have 'redpanda_connected' field"
    );
    assert!(
        body["components"].is_array(),
        "Response should have a 'components' array"
    );

    let status = body["status"].as_str().unwrap_or("");
    assert!(
        status == "healthy" || status == "degraded" || status == "unhealthy",
        "Status should be 'healthy', 'degraded', or 'unhealthy', got '{}'",
        status
    );
}

/// Liveness never depends on dependencies.
#[tokio::test]
async fn test_liveness_probe() {
    let ctx = TestContext::new(RelayVariant::DataSequence);
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server.get("/health/live").await.assert_status_ok();
}

/// Readiness follows the queue connection.
#[tokio::test]
async fn test_readiness_follows_redpanda() {
    let ctx = TestContext::new(RelayVariant::Temperature);
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    health().redpanda.set_unhealthy("broker unreachable");
    server
        .get("/health/ready")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["redpanda_connected"], false);
    assert_eq!(body["components"][0]["message"], "broker unreachable");

    health().redpanda.set_healthy();
    server.get("/health/ready").await.assert_status_ok();

    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["redpanda_connected"], true);
}
