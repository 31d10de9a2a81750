// src/handlers/health.rs

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::services::ChallengeService;

/// Liveness probe with a few cheap counters.
pub async fn health(State(service): State<Arc<ChallengeService>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "realms": service.list_realms().len(),
        "live_attempts": service.tracker_summary().live,
    }))
}
