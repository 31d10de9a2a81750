// src/handlers/character.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{error::AppError, services::ChallengeService};

/// Creates the character on first access. Repeated calls return the stored record.
pub async fn initialize_character(
    State(service): State<Arc<ChallengeService>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let character = service.initialize_character(&user_id).await?;
    Ok((StatusCode::CREATED, Json(character)))
}

pub async fn get_character(
    State(service): State<Arc<ChallengeService>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let character = service.get_character(&user_id).await?;
    Ok(Json(character))
}

/// The realm the learner should continue in.
pub async fn current_realm(
    State(service): State<Arc<ChallengeService>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let realm = service.current_realm(&user_id).await?;
    Ok(Json(realm))
}

pub async fn level_up(
    State(service): State<Arc<ChallengeService>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = service.level_up(&user_id).await?;
    Ok(Json(result))
}
