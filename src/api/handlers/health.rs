/*
 * Responsibility
 * - GET /health (liveness)
 * - Registered outside the gate so probes need no credentials
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
