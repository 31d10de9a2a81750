// src/services/engine.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::OwnedMutexGuard;
use tracing::instrument;

use crate::config::{DEFAULT_ANALYTICS_TIMEOUT_MS, MAX_DIFFICULTY, MIN_DIFFICULTY, STARTER_REALM_ID};
use crate::error::GameError;
use crate::models::boss::{BossOutcome, BossResult, BossStageResult};
use crate::models::challenge::{Answer, Challenge, ChallengeResult, ValidationResult};
use crate::models::character::{Character, CharacterUpdate, RealmUnlock};
use crate::models::reward::{LevelUpResult, Reward};
use crate::realms::{RealmInfo, RealmRegistry, adjusted_score};
use crate::services::analytics::{AnalyticsSink, TracingAnalytics};
use crate::services::difficulty::{DifficultyAdvisor, LevelScaledDifficulty};
use crate::services::progression;
use crate::store::CharacterStore;

const MAX_USER_ID_LEN: usize = 64;

type LockMap = HashMap<String, Arc<tokio::sync::Mutex<()>>>;

/// One async mutex per user, serializing read-modify-write on character state.
///
/// Entries live only while someone holds or waits on them: the last guard out
/// removes its user's entry.
#[derive(Default)]
struct UserLocks {
    locks: Mutex<LockMap>,
}

impl UserLocks {
    fn map(&self) -> MutexGuard<'_, LockMap> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn acquire(&self, user_id: &str) -> UserGuard<'_> {
        let lock = self.map().entry(user_id.to_string()).or_default().clone();
        // Built before waiting so a cancelled wait still prunes the entry.
        let mut guard = UserGuard {
            locks: self,
            user_id: user_id.to_string(),
            guard: None,
        };
        guard.guard = Some(lock.lock_owned().await);
        guard
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map().len()
    }
}

struct UserGuard<'a> {
    locks: &'a UserLocks,
    user_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        // Release first so the guard's own reference is gone from the count.
        drop(self.guard.take());
        let mut map = self.locks.map();
        if map
            .get(&self.user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.user_id);
        }
    }
}

/// Orchestrates the challenge lifecycle: eligibility, realm validation,
/// scoring, rewards, persistence and leveling.
///
/// The engine never branches on concrete realm types; everything goes through
/// `RealmStrategy` trait objects held by the registry.
pub struct GameEngine {
    store: Arc<dyn CharacterStore>,
    realms: Arc<RealmRegistry>,
    analytics: Arc<dyn AnalyticsSink>,
    difficulty: Arc<dyn DifficultyAdvisor>,
    analytics_timeout: Duration,
    user_locks: UserLocks,
}

impl GameEngine {
    pub fn new(store: Arc<dyn CharacterStore>, realms: Arc<RealmRegistry>) -> Self {
        Self {
            difficulty: Arc::new(LevelScaledDifficulty::new(store.clone())),
            store,
            realms,
            analytics: Arc::new(TracingAnalytics),
            analytics_timeout: Duration::from_millis(DEFAULT_ANALYTICS_TIMEOUT_MS),
            user_locks: UserLocks::default(),
        }
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn with_difficulty_advisor(mut self, advisor: Arc<dyn DifficultyAdvisor>) -> Self {
        self.difficulty = advisor;
        self
    }

    pub fn with_analytics_timeout(mut self, timeout: Duration) -> Self {
        self.analytics_timeout = timeout;
        self
    }

    //
    // Characters
    //

    /// Creates the character if needed and makes sure the starter realm is
    /// unlocked. Safe to call repeatedly.
    #[instrument(level = "info", skip(self))]
    pub async fn initialize_character(&self, user_id: &str) -> Result<Character, GameError> {
        validate_user_id(user_id)?;
        if !self.realms.contains(STARTER_REALM_ID) {
            return Err(GameError::RealmNotFound(STARTER_REALM_ID.to_string()));
        }

        let _guard = self.user_locks.acquire(user_id).await;
        let character = self.store.create(Character::new(user_id)).await?;
        if character.has_unlocked(STARTER_REALM_ID) {
            return Ok(character);
        }

        tracing::info!("Initialized character {}", user_id);
        self.store
            .update(
                user_id,
                CharacterUpdate {
                    unlock_realms: vec![RealmUnlock::now(STARTER_REALM_ID)],
                    ..Default::default()
                },
            )
            .await
    }

    pub async fn get_character(&self, user_id: &str) -> Result<Character, GameError> {
        self.store
            .get(user_id)
            .await?
            .ok_or_else(|| GameError::CharacterNotFound(user_id.to_string()))
    }

    /// Most recently unlocked realm still below 100% progress, else the first
    /// unlocked one.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_current_realm(&self, user_id: &str) -> Result<RealmInfo, GameError> {
        let character = self.get_character(user_id).await?;

        let unlocked: Vec<(usize, &RealmUnlock)> = character
            .unlocked_realms
            .iter()
            .enumerate()
            .filter(|(_, unlock)| self.realms.contains(&unlock.realm_id))
            .collect();
        if unlocked.is_empty() {
            return Err(GameError::NotInitialized(user_id.to_string()));
        }

        let current = unlocked
            .iter()
            .filter(|(_, unlock)| unlock.progress < 100)
            .max_by_key(|(index, unlock)| (unlock.unlocked_at, *index))
            .or_else(|| unlocked.first())
            .map(|(_, unlock)| unlock.realm_id.as_str())
            .ok_or_else(|| GameError::NotInitialized(user_id.to_string()))?;

        Ok(self.realms.get(current)?.info().clone())
    }

    /// No-op when the realm is already unlocked.
    #[instrument(level = "info", skip(self))]
    pub async fn unlock_realm(&self, user_id: &str, realm_id: &str) -> Result<Character, GameError> {
        self.realms.get(realm_id)?;
        self.get_character(user_id).await?;

        let _guard = self.user_locks.acquire(user_id).await;
        let character = self.get_character(user_id).await?;
        if character.has_unlocked(realm_id) {
            return Ok(character);
        }
        self.store
            .update(
                user_id,
                CharacterUpdate {
                    unlock_realms: vec![RealmUnlock::now(realm_id)],
                    ..Default::default()
                },
            )
            .await
    }

    /// Re-derives the level from experience and applies any level-up bonuses.
    #[instrument(level = "info", skip(self))]
    pub async fn level_up(&self, user_id: &str) -> Result<LevelUpResult, GameError> {
        self.get_character(user_id).await?;

        let _guard = self.user_locks.acquire(user_id).await;
        let character = self.get_character(user_id).await?;
        let (_, result) = self.settle_level(character).await?;
        Ok(result)
    }

    /// Level check run inside the caller's per-user critical section.
    async fn settle_level(&self, character: Character) -> Result<(Character, LevelUpResult), GameError> {
        let (result, update) =
            progression::level_up_changes(&character, |realm_id| self.realms.contains(realm_id));
        if !result.leveled_up {
            return Ok((character, result));
        }

        let character = self.store.update(&character.user_id, update).await?;
        tracing::info!(
            "Character {} reached level {} (was {})",
            character.user_id,
            result.new_level,
            result.previous_level
        );
        self.forward_level_up(&character.user_id, &result);
        Ok((character, result))
    }

    //
    // Challenges
    //

    pub fn list_realms(&self) -> Vec<RealmInfo> {
        self.realms.list()
    }

    pub fn realm_challenges(&self, realm_id: &str) -> Result<Vec<Challenge>, GameError> {
        Ok(self.realms.get(realm_id)?.get_challenges().to_vec())
    }

    pub fn find_challenge(&self, challenge_id: &str) -> Result<Challenge, GameError> {
        Ok(self.realms.find_challenge(challenge_id)?.1)
    }

    /// Resolves a challenge and checks the character may attempt it.
    #[instrument(level = "debug", skip(self))]
    pub async fn start_challenge(&self, user_id: &str, challenge_id: &str) -> Result<Challenge, GameError> {
        let character = self.get_character(user_id).await?;
        let (_, challenge) = self.realms.find_challenge(challenge_id)?;
        check_eligibility(&character, &challenge.realm_id, challenge.required_level)?;
        Ok(challenge)
    }

    /// Picks a challenge from an unlocked realm. Without an explicit
    /// difficulty the advisor is asked; either way the value is clamped to 1..=5.
    #[instrument(level = "debug", skip(self))]
    pub async fn generate_challenge(
        &self,
        user_id: &str,
        realm_id: &str,
        difficulty: Option<u8>,
    ) -> Result<Challenge, GameError> {
        let character = self.get_character(user_id).await?;
        let realm = self.realms.get(realm_id)?;
        check_eligibility(&character, realm_id, realm.info().required_level)?;

        let requested = match difficulty {
            Some(d) => d,
            None => self
                .difficulty
                .recommended_difficulty(user_id, realm.info().primary_type)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("Difficulty advisor failed for {}: {}", user_id, e);
                    MIN_DIFFICULTY
                }),
        };
        let difficulty = requested.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);

        let challenge = realm.generate_challenge(difficulty)?;
        check_eligibility(&character, realm_id, challenge.required_level)?;
        Ok(challenge)
    }

    /// Validates, scores and rewards one answer.
    ///
    /// Eligibility is checked again so a stale or unauthorized submission is
    /// rejected. Analytics is forwarded in the background and can never fail
    /// the result.
    #[instrument(level = "info", skip(self, answer), fields(hints = answer.hints_used))]
    pub async fn submit_answer(
        &self,
        user_id: &str,
        challenge_id: &str,
        answer: Answer,
    ) -> Result<ChallengeResult, GameError> {
        check_answer(challenge_id, &answer)?;
        self.get_character(user_id).await?;

        let _guard = self.user_locks.acquire(user_id).await;
        let character = self.get_character(user_id).await?;
        let (realm, challenge) = self.realms.find_challenge(challenge_id)?;
        check_eligibility(&character, &challenge.realm_id, challenge.required_level)?;

        if answer.hints_used as usize > challenge.hint_count() {
            return Err(GameError::InvalidInput(format!(
                "hints_used {} exceeds the {} hints available",
                answer.hints_used,
                challenge.hint_count()
            )));
        }

        let validation = realm.validate_answer(&challenge, &answer);
        let score = adjusted_score(&challenge, &validation, answer.time_elapsed, answer.hints_used);
        let rewards = progression::calculate_rewards(&challenge, &validation, score);
        let experience_gained = if validation.is_correct {
            u64::from(score) * u64::from(challenge.difficulty) / 10
        } else {
            0
        };

        let mut update = progression::apply_rewards(&rewards);
        update.experience_delta = update.experience_delta.saturating_add(experience_gained);
        if validation.is_correct {
            let completed = character
                .completed_challenges
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(challenge.id.as_str()));
            let progress = progression::realm_progress(completed, realm.get_challenges());
            update.completed_challenges.push(challenge.id.clone());
            update.realm_progress.push((challenge.realm_id.clone(), progress));
        }

        let character = if update.is_empty() {
            character
        } else {
            self.store.update(user_id, update).await?
        };
        let (character, level_up) = self.settle_level(character).await?;

        tracing::info!(
            "{} answered {}: correct={} score={} xp+{}",
            user_id,
            challenge.id,
            validation.is_correct,
            score,
            experience_gained
        );

        let result = ChallengeResult {
            challenge_id: challenge.id.clone(),
            realm_id: challenge.realm_id.clone(),
            validation,
            score,
            rewards,
            experience_gained,
            answer: answer.clone(),
            level_up: level_up.leveled_up.then_some(level_up),
            character,
        };
        self.forward_attempt(user_id, challenge, answer, result.clone());
        Ok(result)
    }

    /// Side-effect-free score through the owning realm.
    pub fn calculate_score(&self, challenge_id: &str, answer: &Answer) -> Result<u32, GameError> {
        let (realm, challenge) = self.realms.find_challenge(challenge_id)?;
        Ok(realm.calculate_score(&challenge, answer, answer.time_elapsed))
    }

    //
    // Bosses
    //

    /// Looks the boss up in its realm and checks the character may face it.
    #[instrument(level = "info", skip(self))]
    pub async fn process_boss_challenge(
        &self,
        user_id: &str,
        realm_id: &str,
        boss_id: &str,
    ) -> Result<BossResult, GameError> {
        let realm = self.realms.get(realm_id)?;
        let character = self.get_character(user_id).await?;
        let boss = realm.process_boss_challenge(user_id, boss_id)?;
        check_eligibility(&character, realm_id, boss.required_level)?;
        Ok(boss)
    }

    /// Grades every stage. Victory needs all stages correct and pays the boss
    /// rewards plus a trophy badge; a defeat changes nothing.
    #[instrument(level = "info", skip(self, answers), fields(answers = answers.len()))]
    pub async fn resolve_boss_challenge(
        &self,
        user_id: &str,
        realm_id: &str,
        boss_id: &str,
        answers: Vec<Answer>,
    ) -> Result<BossOutcome, GameError> {
        let realm = self.realms.get(realm_id)?;
        self.get_character(user_id).await?;

        let _guard = self.user_locks.acquire(user_id).await;
        let character = self.get_character(user_id).await?;
        let boss = realm.process_boss_challenge(user_id, boss_id)?;
        check_eligibility(&character, realm_id, boss.required_level)?;

        if let Some(stray) = answers
            .iter()
            .find(|a| !boss.stages.iter().any(|stage| stage.id == a.challenge_id))
        {
            return Err(GameError::InvalidInput(format!(
                "challenge '{}' is not a stage of boss '{}'",
                stray.challenge_id, boss_id
            )));
        }

        let stages: Vec<BossStageResult> = boss
            .stages
            .iter()
            .map(|stage| {
                let validation = match answers.iter().find(|a| a.challenge_id == stage.id) {
                    Some(answer) if !answer.response.is_blank() => realm.validate_answer(stage, answer),
                    _ => ValidationResult::incorrect(0.0, "No answer given for this stage.", String::new()),
                };
                BossStageResult {
                    challenge_id: stage.id.clone(),
                    validation,
                }
            })
            .collect();
        let victory = stages.iter().all(|s| s.validation.is_correct);

        if !victory {
            tracing::info!("{} was defeated by {}", user_id, boss_id);
            return Ok(BossOutcome {
                boss_id: boss.boss_id,
                realm_id: boss.realm_id,
                victory,
                stages,
                rewards: Vec::new(),
                level_up: None,
                character,
            });
        }

        let mut rewards = boss.victory_rewards.clone();
        rewards.push(Reward::badge(
            &format!("boss-{}", boss.boss_id),
            &format!("Defeated {}", boss.name),
        ));
        let character = self
            .store
            .update(user_id, progression::apply_rewards(&rewards))
            .await?;
        let (character, level_up) = self.settle_level(character).await?;
        tracing::info!("{} defeated {}", user_id, boss_id);

        Ok(BossOutcome {
            boss_id: boss.boss_id,
            realm_id: boss.realm_id,
            victory,
            stages,
            rewards,
            level_up: level_up.leveled_up.then_some(level_up),
            character,
        })
    }

    //
    // Analytics
    //

    fn forward_attempt(&self, user_id: &str, challenge: Challenge, answer: Answer, result: ChallengeResult) {
        let sink = self.analytics.clone();
        let timeout = self.analytics_timeout;
        let user_id = user_id.to_string();
        tokio::spawn(async move {
            let call = sink.record_attempt(&user_id, &challenge, &answer, &result);
            match tokio::time::timeout(timeout, call).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!("Analytics failed for {}/{}: {}", user_id, challenge.id, e),
                Err(_) => tracing::warn!("Analytics timed out for {}/{}", user_id, challenge.id),
            }
        });
    }

    fn forward_level_up(&self, user_id: &str, result: &LevelUpResult) {
        let sink = self.analytics.clone();
        let timeout = self.analytics_timeout;
        let user_id = user_id.to_string();
        let result = result.clone();
        tokio::spawn(async move {
            match tokio::time::timeout(timeout, sink.record_level_up(&user_id, &result)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!("Level-up analytics failed for {}: {}", user_id, e),
                Err(_) => tracing::warn!("Level-up analytics timed out for {}", user_id),
            }
        });
    }
}

fn validate_user_id(user_id: &str) -> Result<(), GameError> {
    if user_id.trim().is_empty() || user_id.len() > MAX_USER_ID_LEN {
        return Err(GameError::InvalidInput(format!(
            "user id must be 1 to {} characters",
            MAX_USER_ID_LEN
        )));
    }
    Ok(())
}

/// Level first, then the realm unlock.
fn check_eligibility(character: &Character, realm_id: &str, required_level: u32) -> Result<(), GameError> {
    if character.level < required_level {
        tracing::debug!(
            "{} is level {}, needs {} for {}",
            character.user_id,
            character.level,
            required_level,
            realm_id
        );
        return Err(GameError::LevelRequired {
            required: required_level,
            current: character.level,
        });
    }
    if !character.has_unlocked(realm_id) {
        tracing::debug!("{} has not unlocked {}", character.user_id, realm_id);
        return Err(GameError::RealmLocked(realm_id.to_string()));
    }
    Ok(())
}

/// Required-field checks on an answer, before any state is touched.
pub fn check_answer(challenge_id: &str, answer: &Answer) -> Result<(), GameError> {
    if answer.challenge_id != challenge_id {
        return Err(GameError::InvalidInput(format!(
            "answer is for '{}', not '{}'",
            answer.challenge_id, challenge_id
        )));
    }
    if answer.response.is_blank() {
        return Err(GameError::InvalidInput("response is required".to_string()));
    }
    if !answer.time_elapsed.is_finite() || answer.time_elapsed < 0.0 {
        return Err(GameError::InvalidInput(
            "time_elapsed must be a non-negative number of seconds".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::challenge::AnswerResponse;
    use crate::store::MemoryCharacterStore;

    fn engine() -> GameEngine {
        GameEngine::new(
            Arc::new(MemoryCharacterStore::new()),
            Arc::new(RealmRegistry::with_default_realms().unwrap()),
        )
    }

    fn answer(challenge_id: &str, text: &str) -> Answer {
        Answer {
            challenge_id: challenge_id.to_string(),
            response: AnswerResponse::Text(text.to_string()),
            time_elapsed: 5.0,
            hints_used: 0,
        }
    }

    #[test]
    fn answer_checks() {
        assert!(check_answer("a", &answer("a", "1")).is_ok());
        assert!(check_answer("a", &answer("b", "1")).is_err());
        assert!(check_answer("a", &answer("a", "  ")).is_err());

        let mut bad_time = answer("a", "1");
        bad_time.time_elapsed = f64::NAN;
        assert!(check_answer("a", &bad_time).is_err());
    }

    #[test]
    fn eligibility_checks_level_before_unlock() {
        let character = Character::new("ada");
        assert_eq!(
            check_eligibility(&character, "word-woods", 3).unwrap_err(),
            GameError::LevelRequired { required: 3, current: 1 }
        );
        assert_eq!(
            check_eligibility(&character, "word-woods", 1).unwrap_err(),
            GameError::RealmLocked("word-woods".into())
        );
    }

    #[tokio::test]
    async fn user_ids_are_validated() {
        let engine = engine();
        assert!(matches!(
            engine.initialize_character("").await,
            Err(GameError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.initialize_character(&"x".repeat(65)).await,
            Err(GameError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn too_many_hints_are_rejected() {
        let engine = engine();
        engine.initialize_character("ada").await.unwrap();
        let mut a = answer("ng-add-1", "12");
        a.hints_used = 3;
        assert!(matches!(
            engine.submit_answer("ada", "ng-add-1", a).await,
            Err(GameError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn current_realm_prefers_latest_incomplete_unlock() {
        let engine = engine();
        engine.initialize_character("ada").await.unwrap();
        engine.unlock_realm("ada", "word-woods").await.unwrap();
        assert_eq!(engine.get_current_realm("ada").await.unwrap().id, "word-woods");

        engine
            .store
            .update(
                "ada",
                CharacterUpdate {
                    realm_progress: vec![("word-woods".into(), 100)],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(engine.get_current_realm("ada").await.unwrap().id, "number-grove");

        engine
            .store
            .update(
                "ada",
                CharacterUpdate {
                    realm_progress: vec![("number-grove".into(), 100)],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            engine.get_current_realm("ada").await.unwrap().id,
            "number-grove",
            "falls back to the first unlocked realm"
        );
    }

    #[tokio::test]
    async fn current_realm_without_unlocks_is_not_initialized() {
        let engine = engine();
        engine.store.create(Character::new("bare")).await.unwrap();
        assert_eq!(
            engine.get_current_realm("bare").await.unwrap_err(),
            GameError::NotInitialized("bare".into())
        );
    }

    #[tokio::test]
    async fn unknown_users_leave_no_lock_behind() {
        let engine = engine();
        for ghost in ["ghost-0", "ghost-1", "ghost-2"] {
            assert!(matches!(
                engine.level_up(ghost).await,
                Err(GameError::CharacterNotFound(_))
            ));
            assert!(matches!(
                engine.unlock_realm(ghost, "number-grove").await,
                Err(GameError::CharacterNotFound(_))
            ));
        }
        assert_eq!(engine.user_locks.len(), 0);

        engine.initialize_character("ada").await.unwrap();
        engine.level_up("ada").await.unwrap();
        engine
            .submit_answer("ada", "ng-add-1", answer("ng-add-1", "12"))
            .await
            .unwrap();
        assert_eq!(engine.user_locks.len(), 0, "released locks are pruned");
    }

    #[tokio::test]
    async fn contended_lock_survives_until_last_holder() {
        let engine = Arc::new(engine());
        engine.initialize_character("ada").await.unwrap();

        let first = engine.user_locks.acquire("ada").await;
        let waiter = {
            let engine = engine.clone();
            tokio::spawn(async move {
                let _second = engine.user_locks.acquire("ada").await;
            })
        };
        tokio::task::yield_now().await;
        drop(first);
        assert_eq!(engine.user_locks.len(), 1, "waiter still holds the entry");

        waiter.await.unwrap();
        assert_eq!(engine.user_locks.len(), 0);
    }

    #[tokio::test]
    async fn unlocking_unknown_realm_fails() {
        let engine = engine();
        engine.initialize_character("ada").await.unwrap();
        assert!(matches!(
            engine.unlock_realm("ada", "atlantis").await,
            Err(GameError::RealmNotFound(_))
        ));
    }
}
