//! Axum-based HTTP JSON transport
//!
//! One possible transport for the [`crate::service::ChargingService`]
//! contract: the three session operations as JSON POST endpoints plus
//! health and status probes. Typed faults map to status codes so clients
//! can branch without parsing reason strings: state faults are 409,
//! validation faults 422, everything else 500.

use crate::error::FaradayError;
use crate::sample::ChargingSample;
use crate::service::{ChargingService, SessionService};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub service: SessionService,
}

#[derive(Deserialize)]
pub struct SessionBody {
    pub vehicle_id: String,
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let controller = state.service.controller();
    let snapshot = controller.lock().await.snapshot();
    Json(snapshot)
}

async fn start_session(
    State(state): State<AppState>,
    Json(body): Json<SessionBody>,
) -> impl IntoResponse {
    match state.service.start_session(&body.vehicle_id).await {
        Ok(()) => ok_response(),
        Err(e) => fault_response(&e),
    }
}

async fn push_sample(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    // A missing or undecodable sample is a validation fault on the wire
    let sample: ChargingSample = match serde_json::from_value(body) {
        Ok(s) => s,
        Err(_) => {
            let e = FaradayError::validation("Sample is null.", None, None);
            return fault_response(&e);
        }
    };
    match state.service.push_sample(sample).await {
        Ok(()) => ok_response(),
        Err(e) => fault_response(&e),
    }
}

async fn end_session(
    State(state): State<AppState>,
    Json(body): Json<SessionBody>,
) -> impl IntoResponse {
    match state.service.end_session(&body.vehicle_id).await {
        Ok(()) => ok_response(),
        Err(e) => fault_response(&e),
    }
}

fn ok_response() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({"ok": true})))
}

fn fault_response(err: &FaradayError) -> (StatusCode, Json<serde_json::Value>) {
    match err {
        FaradayError::State { fault } => (
            StatusCode::CONFLICT,
            Json(serde_json::to_value(fault).unwrap_or(serde_json::json!({"reason": "state"}))),
        ),
        FaradayError::Validation { fault } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(
                serde_json::to_value(fault)
                    .unwrap_or(serde_json::json!({"reason": "validation"})),
            ),
        ),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": other.to_string()})),
        ),
    }
}

/// Build the application router for the given service
pub fn router(service: SessionService) -> Router {
    let state = AppState { service };
    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/session/start", post(start_session))
        .route("/api/session/sample", post(push_sample))
        .route("/api/session/end", post(end_session))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve the transport until the process stops
pub async fn serve(service: SessionService, host: &str, port: u16) -> anyhow::Result<()> {
    let router = router(service);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .unwrap_or(([127, 0, 0, 1], port).into());
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;
    Ok(())
}
