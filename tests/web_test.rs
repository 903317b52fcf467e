use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use faraday::controller::SessionController;
use faraday::service::SessionService;
use http_body_util::BodyExt;
use tower::ServiceExt;

fn test_router(dir: &std::path::Path) -> axum::Router {
    let service = SessionService::new(SessionController::new(dir.join("data")));
    faraday::web::router(service)
}

fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn sample_json(row: u32) -> serde_json::Value {
    serde_json::json!({
        "timestamp": "2024-05-12T10:00:00Z",
        "voltage_rms_min": 229.0,
        "voltage_rms_avg": 230.0,
        "voltage_rms_max": 231.0,
        "current_rms_min": 14.0,
        "current_rms_avg": 15.0,
        "current_rms_max": 16.0,
        "real_power_min": 3.2,
        "real_power_avg": 3.5,
        "real_power_max": 3.7,
        "reactive_power_min": 0.1,
        "reactive_power_avg": 0.2,
        "reactive_power_max": 0.3,
        "apparent_power_min": 3.3,
        "apparent_power_avg": 3.6,
        "apparent_power_max": 3.8,
        "frequency_min": 49.95,
        "frequency_avg": 50.0,
        "frequency_max": 50.05,
        "row_index": row,
        "vehicle_id": "EV1",
    })
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_ok() {
    let dir = tempfile::tempdir().unwrap();
    let response = test_router(dir.path())
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn full_session_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());

    let response = router
        .clone()
        .oneshot(json_post(
            "/api/session/start",
            serde_json::json!({"vehicle_id": "EV1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(json_post("/api/session/sample", sample_json(1)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = body_json(response).await;
    assert_eq!(status["active"], true);
    assert_eq!(status["accepted_count"], 1);

    let response = router
        .oneshot(json_post(
            "/api/session/end",
            serde_json::json!({"vehicle_id": "ev1 "}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn double_start_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());

    let response = router
        .clone()
        .oneshot(json_post(
            "/api/session/start",
            serde_json::json!({"vehicle_id": "EV1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(json_post(
            "/api/session/start",
            serde_json::json!({"vehicle_id": "EV1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let fault = body_json(response).await;
    assert_eq!(fault["reason"], "Session already active.");
}

#[tokio::test]
async fn invalid_sample_is_unprocessable() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());

    router
        .clone()
        .oneshot(json_post(
            "/api/session/start",
            serde_json::json!({"vehicle_id": "EV1"}),
        ))
        .await
        .unwrap();

    let mut bad = sample_json(2);
    bad["voltage_rms_min"] = serde_json::json!(0.0);
    let response = router
        .oneshot(json_post("/api/session/sample", bad))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let fault = body_json(response).await;
    assert_eq!(fault["reason"], "Voltage RMS must be > 0.");
    assert_eq!(fault["row_index"], 2);
    assert_eq!(fault["vehicle_id"], "EV1");
}

#[tokio::test]
async fn undecodable_sample_body_is_a_validation_fault() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());

    router
        .clone()
        .oneshot(json_post(
            "/api/session/start",
            serde_json::json!({"vehicle_id": "EV1"}),
        ))
        .await
        .unwrap();

    let response = router
        .oneshot(json_post(
            "/api/session/sample",
            serde_json::json!({"garbage": true}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let fault = body_json(response).await;
    assert_eq!(fault["reason"], "Sample is null.");
}

#[tokio::test]
async fn sample_without_session_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let response = test_router(dir.path())
        .oneshot(json_post("/api/session/sample", sample_json(1)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let fault = body_json(response).await;
    assert_eq!(fault["reason"], "No active session.");
}

#[tokio::test]
async fn end_with_wrong_vehicle_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(dir.path());

    router
        .clone()
        .oneshot(json_post(
            "/api/session/start",
            serde_json::json!({"vehicle_id": "EV1"}),
        ))
        .await
        .unwrap();

    let response = router
        .clone()
        .oneshot(json_post(
            "/api/session/end",
            serde_json::json!({"vehicle_id": "EV2"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Session survives the mismatch
    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = body_json(response).await;
    assert_eq!(status["active"], true);
}
