// src/handlers/challenge.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError,
    models::challenge::{GenerateChallengeRequest, SubmitAnswerRequest},
    services::ChallengeService,
};

/// Starts (or restarts) an attempt on a catalogue challenge.
pub async fn start_challenge(
    State(service): State<Arc<ChallengeService>>,
    Path((user_id, challenge_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let started = service.start_challenge(&user_id, &challenge_id).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

/// Generates a challenge in a realm and starts an attempt on it.
///
/// `?difficulty=1..5`; the difficulty advisor decides when omitted.
pub async fn generate_challenge(
    State(service): State<Arc<ChallengeService>>,
    Path((user_id, realm_id)): Path<(String, String)>,
    Query(params): Query<GenerateChallengeRequest>,
) -> Result<impl IntoResponse, AppError> {
    params.validate()?;
    let started = service
        .generate_challenge(&user_id, &realm_id, params.difficulty)
        .await?;
    Ok((StatusCode::CREATED, Json(started)))
}

pub async fn submit_answer(
    State(service): State<Arc<ChallengeService>>,
    Path((user_id, challenge_id)): Path<(String, String)>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let answer = payload
        .into_answer(&challenge_id)
        .ok_or_else(|| AppError::BadRequest("response is required".to_string()))?;

    let result = service.submit_answer(&user_id, &challenge_id, answer).await?;
    Ok(Json(result))
}

pub async fn abandon_challenge(
    State(service): State<Arc<ChallengeService>>,
    Path((user_id, challenge_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let stats = service.abandon_challenge(&user_id, &challenge_id)?;
    Ok(Json(stats))
}

pub async fn get_hint(
    State(service): State<Arc<ChallengeService>>,
    Path((user_id, challenge_id, index)): Path<(String, String, usize)>,
) -> Result<impl IntoResponse, AppError> {
    let hint = service.request_hint(&user_id, &challenge_id, index)?;
    Ok(Json(hint))
}

pub async fn attempt_stats(
    State(service): State<Arc<ChallengeService>>,
    Path((user_id, challenge_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let stats = service.attempt_stats(&user_id, &challenge_id)?;
    Ok(Json(stats))
}

pub async fn tracker_summary(State(service): State<Arc<ChallengeService>>) -> impl IntoResponse {
    Json(service.tracker_summary())
}

/// Scores an answer without touching any state.
pub async fn score_answer(
    State(service): State<Arc<ChallengeService>>,
    Path(challenge_id): Path<String>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let answer = payload
        .into_answer(&challenge_id)
        .ok_or_else(|| AppError::BadRequest("response is required".to_string()))?;

    let score = service.calculate_score(&challenge_id, &answer)?;
    Ok(Json(json!({
        "challenge_id": challenge_id,
        "score": score,
    })))
}
