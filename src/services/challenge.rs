// src/services/challenge.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::instrument;

use crate::error::GameError;
use crate::models::attempt::{Attempt, AttemptStats, HintResponse, StartedBoss, StartedChallenge, TrackerSummary};
use crate::models::boss::{BossOutcome, PublicBoss};
use crate::models::challenge::{Answer, ChallengeResult, PublicChallenge};
use crate::models::character::Character;
use crate::models::reward::LevelUpResult;
use crate::realms::RealmInfo;
use crate::services::attempts::{AttemptTracker, no_active_attempt, spawn_attempt_sweeper};
use crate::services::engine::{GameEngine, check_answer};

/// Caller-facing boundary: the engine plus attempt bookkeeping and hint policy.
pub struct ChallengeService {
    engine: Arc<GameEngine>,
    tracker: Arc<AttemptTracker>,
    attempt_max_age: Duration,
}

fn boss_key(boss_id: &str) -> String {
    format!("boss:{}", boss_id)
}

impl ChallengeService {
    pub fn new(engine: Arc<GameEngine>, tracker: Arc<AttemptTracker>, attempt_max_age: Duration) -> Self {
        Self {
            engine,
            tracker,
            attempt_max_age,
        }
    }

    pub async fn initialize_character(&self, user_id: &str) -> Result<Character, GameError> {
        self.engine.initialize_character(user_id).await
    }

    pub async fn get_character(&self, user_id: &str) -> Result<Character, GameError> {
        self.engine.get_character(user_id).await
    }

    pub async fn current_realm(&self, user_id: &str) -> Result<RealmInfo, GameError> {
        self.engine.get_current_realm(user_id).await
    }

    pub async fn level_up(&self, user_id: &str) -> Result<LevelUpResult, GameError> {
        self.engine.level_up(user_id).await
    }

    pub fn list_realms(&self) -> Vec<RealmInfo> {
        self.engine.list_realms()
    }

    pub fn realm_challenges(&self, realm_id: &str) -> Result<Vec<PublicChallenge>, GameError> {
        Ok(self
            .engine
            .realm_challenges(realm_id)?
            .iter()
            .map(PublicChallenge::from)
            .collect())
    }

    /// Checks eligibility and opens (or replaces) the attempt.
    #[instrument(level = "info", skip(self))]
    pub async fn start_challenge(&self, user_id: &str, challenge_id: &str) -> Result<StartedChallenge, GameError> {
        let challenge = self.engine.start_challenge(user_id, challenge_id).await?;
        let attempt = self.tracker.start(user_id, &challenge.id);
        Ok(StartedChallenge {
            attempt: attempt.stats(),
            challenge: PublicChallenge::from(&challenge),
        })
    }

    #[instrument(level = "info", skip(self))]
    pub async fn generate_challenge(
        &self,
        user_id: &str,
        realm_id: &str,
        difficulty: Option<u8>,
    ) -> Result<StartedChallenge, GameError> {
        let challenge = self
            .engine
            .generate_challenge(user_id, realm_id, difficulty)
            .await?;
        let attempt = self.tracker.start(user_id, &challenge.id);
        Ok(StartedChallenge {
            attempt: attempt.stats(),
            challenge: PublicChallenge::from(&challenge),
        })
    }

    /// Consumes the live attempt and scores the answer.
    ///
    /// Hint usage and elapsed time are never lower than what the server
    /// observed for the attempt. A rejected submission leaves the attempt live.
    #[instrument(level = "info", skip(self, answer))]
    pub async fn submit_answer(
        &self,
        user_id: &str,
        challenge_id: &str,
        mut answer: Answer,
    ) -> Result<ChallengeResult, GameError> {
        check_answer(challenge_id, &answer)?;

        let attempt = self
            .tracker
            .end(user_id, challenge_id)
            .ok_or_else(|| no_active_attempt(user_id, challenge_id))?;

        answer.hints_used = answer.hints_used.max(attempt.hints_used);
        answer.time_elapsed = answer.time_elapsed.max(attempt.elapsed_secs());

        let result = self.engine.submit_answer(user_id, challenge_id, answer).await;
        self.settle(attempt, &result);
        result
    }

    #[instrument(level = "info", skip(self))]
    pub fn abandon_challenge(&self, user_id: &str, challenge_id: &str) -> Result<AttemptStats, GameError> {
        let attempt = self.tracker.abandon(user_id, challenge_id)?;
        Ok(attempt.stats())
    }

    /// Dispenses hint `index` for a live attempt.
    #[instrument(level = "debug", skip(self))]
    pub fn request_hint(&self, user_id: &str, challenge_id: &str, index: usize) -> Result<HintResponse, GameError> {
        if self.tracker.get(user_id, challenge_id).is_none() {
            return Err(no_active_attempt(user_id, challenge_id));
        }

        let challenge = self.engine.find_challenge(challenge_id)?;
        let text = challenge
            .content
            .hints
            .get(index)
            .cloned()
            .ok_or_else(|| GameError::HintNotFound {
                challenge_id: challenge_id.to_string(),
                index,
            })?;

        let hints_used = self.tracker.touch(user_id, challenge_id, index)?;
        Ok(HintResponse {
            challenge_id: challenge_id.to_string(),
            index,
            text,
            hints_used,
            hints_remaining: challenge.hint_count().saturating_sub(hints_used as usize),
        })
    }

    pub fn attempt_stats(&self, user_id: &str, challenge_id: &str) -> Result<AttemptStats, GameError> {
        self.tracker
            .get(user_id, challenge_id)
            .ok_or_else(|| no_active_attempt(user_id, challenge_id))
    }

    pub fn tracker_summary(&self) -> TrackerSummary {
        self.tracker.summary()
    }

    pub fn calculate_score(&self, challenge_id: &str, answer: &Answer) -> Result<u32, GameError> {
        check_answer(challenge_id, answer)?;
        self.engine.calculate_score(challenge_id, answer)
    }

    #[instrument(level = "info", skip(self))]
    pub async fn start_boss(&self, user_id: &str, realm_id: &str, boss_id: &str) -> Result<StartedBoss, GameError> {
        let boss = self
            .engine
            .process_boss_challenge(user_id, realm_id, boss_id)
            .await?;
        let attempt = self.tracker.start(user_id, &boss_key(&boss.boss_id));
        Ok(StartedBoss {
            attempt: attempt.stats(),
            boss: PublicBoss::from(&boss),
        })
    }

    /// One resolution per start.
    #[instrument(level = "info", skip(self, answers))]
    pub async fn resolve_boss(
        &self,
        user_id: &str,
        realm_id: &str,
        boss_id: &str,
        answers: Vec<Answer>,
    ) -> Result<BossOutcome, GameError> {
        let key = boss_key(boss_id);
        let attempt = self
            .tracker
            .end(user_id, &key)
            .ok_or_else(|| no_active_attempt(user_id, &key))?;
        let outcome = self
            .engine
            .resolve_boss_challenge(user_id, realm_id, boss_id, answers)
            .await;
        self.settle(attempt, &outcome);
        outcome
    }

    /// Counts a scored attempt as completed; hands a rejected one back.
    fn settle<T>(&self, attempt: Attempt, result: &Result<T, GameError>) {
        match result {
            Ok(_) => self.tracker.complete(&attempt),
            Err(e) if e.is_client_error() => {
                if self.tracker.restore(attempt) {
                    tracing::debug!("Submission rejected ({}), attempt kept", e.code());
                }
            }
            Err(_) => {}
        }
    }

    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        spawn_attempt_sweeper(self.tracker.clone(), every, self.attempt_max_age)
    }
}
