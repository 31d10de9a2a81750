// src/services/analytics.rs

use async_trait::async_trait;

use crate::error::GameError;
use crate::models::challenge::{Answer, Challenge, ChallengeResult};
use crate::models::reward::LevelUpResult;

/// Best-effort sink for learning events. The engine calls it fire-and-forget
/// under a timeout and only logs failures.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn record_attempt(
        &self,
        user_id: &str,
        challenge: &Challenge,
        answer: &Answer,
        result: &ChallengeResult,
    ) -> Result<(), GameError>;

    async fn record_level_up(&self, user_id: &str, result: &LevelUpResult) -> Result<(), GameError>;
}

/// Emits events on the `analytics` tracing target.
#[derive(Debug, Default, Clone)]
pub struct TracingAnalytics;

#[async_trait]
impl AnalyticsSink for TracingAnalytics {
    async fn record_attempt(
        &self,
        user_id: &str,
        challenge: &Challenge,
        answer: &Answer,
        result: &ChallengeResult,
    ) -> Result<(), GameError> {
        tracing::info!(
            target: "analytics",
            user_id,
            challenge_id = %challenge.id,
            realm_id = %challenge.realm_id,
            difficulty = challenge.difficulty,
            correct = result.validation.is_correct,
            score = result.score,
            experience_gained = result.experience_gained,
            hints_used = answer.hints_used,
            time_elapsed = answer.time_elapsed,
            "attempt recorded"
        );
        Ok(())
    }

    async fn record_level_up(&self, user_id: &str, result: &LevelUpResult) -> Result<(), GameError> {
        tracing::info!(
            target: "analytics",
            user_id,
            previous_level = result.previous_level,
            new_level = result.new_level,
            unlocked = ?result.unlocked_realms,
            "level gained"
        );
        Ok(())
    }
}
