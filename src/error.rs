// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Domain errors raised by the engine, the attempt tracker, realms and stores.
///
/// Every variant is a distinct, named condition so the presentation layer can
/// render a specific message (e.g. a "requirements" panel for eligibility errors).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GameError {
    #[error("character '{0}' not found")]
    CharacterNotFound(String),

    #[error("challenge '{0}' not found")]
    ChallengeNotFound(String),

    #[error("realm '{0}' not found")]
    RealmNotFound(String),

    #[error("boss '{0}' not found")]
    BossNotFound(String),

    #[error("challenge '{challenge_id}' has no hint at index {index}")]
    HintNotFound { challenge_id: String, index: usize },

    #[error("level {required} required (current level {current})")]
    LevelRequired { required: u32, current: u32 },

    #[error("realm '{0}' not unlocked")]
    RealmLocked(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Submit, hint or abandon without a live attempt: start before submit.
    #[error("no active attempt for challenge '{challenge_id}'")]
    NoActiveAttempt { user_id: String, challenge_id: String },

    #[error("character '{0}' has no unlocked realms; initialize the character first")]
    NotInitialized(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("analytics error: {0}")]
    Analytics(String),

    /// Raised while registering realm content at boot.
    #[error("invalid realm catalogue: {0}")]
    Catalogue(String),
}

impl GameError {
    /// Stable machine-readable identifier sent to clients next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            GameError::CharacterNotFound(_) => "character_not_found",
            GameError::ChallengeNotFound(_) => "challenge_not_found",
            GameError::RealmNotFound(_) => "realm_not_found",
            GameError::BossNotFound(_) => "boss_not_found",
            GameError::HintNotFound { .. } => "hint_not_found",
            GameError::LevelRequired { .. } => "level_required",
            GameError::RealmLocked(_) => "realm_not_unlocked",
            GameError::InvalidInput(_) => "invalid_input",
            GameError::NoActiveAttempt { .. } => "no_active_attempt",
            GameError::NotInitialized(_) => "character_not_initialized",
            GameError::Storage(_) => "storage_error",
            GameError::Analytics(_) => "analytics_error",
            GameError::Catalogue(_) => "catalogue_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GameError::CharacterNotFound(_)
            | GameError::ChallengeNotFound(_)
            | GameError::RealmNotFound(_)
            | GameError::BossNotFound(_)
            | GameError::HintNotFound { .. } => StatusCode::NOT_FOUND,
            GameError::LevelRequired { .. } | GameError::RealmLocked(_) => StatusCode::FORBIDDEN,
            GameError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GameError::NoActiveAttempt { .. } | GameError::NotInitialized(_) => {
                StatusCode::CONFLICT
            }
            GameError::Storage(_) | GameError::Analytics(_) | GameError::Catalogue(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Rejections of the caller's input or state. The engine raises these
    /// before it writes anything.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Eligibility failures (level, unlock) as opposed to missing entities.
    pub fn is_eligibility(&self) -> bool {
        matches!(
            self,
            GameError::LevelRequired { .. } | GameError::RealmLocked(_)
        )
    }
}

impl From<sqlx::Error> for GameError {
    fn from(err: sqlx::Error) -> Self {
        GameError::Storage(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for GameError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        GameError::Storage(err.to_string())
    }
}

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 400 Bad Request
    BadRequest(String),

    // Domain errors carry their own status and code.
    Game(GameError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_input", msg),
            AppError::Game(err) => {
                let status = err.status();
                if status.is_server_error() {
                    tracing::error!("Internal Server Error: {}", err);
                    (status, err.code(), "Internal Server Error".to_string())
                } else {
                    (status, err.code(), err.to_string())
                }
            }
        };
        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl From<GameError> for AppError {
    fn from(err: GameError) -> Self {
        AppError::Game(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
