// src/services/difficulty.rs

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{MAX_DIFFICULTY, MIN_DIFFICULTY};
use crate::error::GameError;
use crate::models::challenge::ChallengeType;
use crate::store::CharacterStore;

/// Recommends a difficulty (1..=5) for a learner and challenge type.
#[async_trait]
pub trait DifficultyAdvisor: Send + Sync {
    async fn recommended_difficulty(
        &self,
        user_id: &str,
        challenge_type: ChallengeType,
    ) -> Result<u8, GameError>;
}

/// One difficulty step for every two levels above the type's entry level.
pub struct LevelScaledDifficulty {
    store: Arc<dyn CharacterStore>,
}

impl LevelScaledDifficulty {
    pub fn new(store: Arc<dyn CharacterStore>) -> Self {
        Self { store }
    }

    fn entry_level(challenge_type: ChallengeType) -> u32 {
        match challenge_type {
            ChallengeType::Arithmetic => 1,
            ChallengeType::MultipleChoice | ChallengeType::FillBlank => 3,
            ChallengeType::Ordering => 5,
        }
    }

    pub fn for_level(level: u32, challenge_type: ChallengeType) -> u8 {
        let steps = level.saturating_sub(Self::entry_level(challenge_type)) / 2;
        let difficulty = u32::from(MIN_DIFFICULTY).saturating_add(steps);
        u8::try_from(difficulty.min(u32::from(MAX_DIFFICULTY))).unwrap_or(MAX_DIFFICULTY)
    }
}

#[async_trait]
impl DifficultyAdvisor for LevelScaledDifficulty {
    async fn recommended_difficulty(
        &self,
        user_id: &str,
        challenge_type: ChallengeType,
    ) -> Result<u8, GameError> {
        let character = self
            .store
            .get(user_id)
            .await?
            .ok_or_else(|| GameError::CharacterNotFound(user_id.to_string()))?;
        Ok(Self::for_level(character.level, challenge_type))
    }
}
