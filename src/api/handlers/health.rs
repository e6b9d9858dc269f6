/*
 * Responsibility
 * - GET /health (liveness check)
 * - Public: no role rule should match it
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
