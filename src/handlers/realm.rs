// src/handlers/realm.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{error::AppError, services::ChallengeService};

/// Lists every registered realm in registration order.
pub async fn list_realms(State(service): State<Arc<ChallengeService>>) -> impl IntoResponse {
    Json(service.list_realms())
}

/// A realm's catalogue, answers and hint texts hidden.
pub async fn list_challenges(
    State(service): State<Arc<ChallengeService>>,
    Path(realm_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let challenges = service.realm_challenges(&realm_id)?;
    Ok(Json(challenges))
}
