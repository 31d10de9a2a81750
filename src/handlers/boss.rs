// src/handlers/boss.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{error::AppError, models::boss::ResolveBossRequest, services::ChallengeService};

pub async fn start_boss(
    State(service): State<Arc<ChallengeService>>,
    Path((user_id, realm_id, boss_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let started = service.start_boss(&user_id, &realm_id, &boss_id).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

/// Resolves the encounter opened by `start_boss`. Every stage must be correct to win.
pub async fn resolve_boss(
    State(service): State<Arc<ChallengeService>>,
    Path((user_id, realm_id, boss_id)): Path<(String, String, String)>,
    Json(payload): Json<ResolveBossRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let outcome = service
        .resolve_boss(&user_id, &realm_id, &boss_id, payload.into_answers())
        .await?;
    Ok(Json(outcome))
}
