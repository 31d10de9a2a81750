// tests/engine_tests.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use realm_academy::{
    error::GameError,
    models::{
        challenge::{Answer, AnswerResponse, Challenge, ChallengeResult},
        character::CharacterUpdate,
        reward::{LevelUpResult, Reward},
    },
    realms::RealmRegistry,
    services::{AnalyticsSink, AttemptTracker, ChallengeService, GameEngine, progression},
    store::{CharacterStore, MemoryCharacterStore},
};

struct Harness {
    store: Arc<MemoryCharacterStore>,
    engine: Arc<GameEngine>,
    service: ChallengeService,
}

fn harness_with(analytics: Option<Arc<dyn AnalyticsSink>>) -> Harness {
    let store = Arc::new(MemoryCharacterStore::new());
    let realms = Arc::new(RealmRegistry::with_default_realms().expect("bundled realms are valid"));
    let mut engine = GameEngine::new(store.clone(), realms).with_analytics_timeout(Duration::from_millis(200));
    if let Some(analytics) = analytics {
        engine = engine.with_analytics(analytics);
    }
    let engine = Arc::new(engine);
    let service = ChallengeService::new(
        engine.clone(),
        Arc::new(AttemptTracker::new()),
        Duration::from_secs(3_600),
    );
    Harness { store, engine, service }
}

fn harness() -> Harness {
    harness_with(None)
}

fn text_answer(challenge_id: &str, text: &str, time_elapsed: f64, hints_used: u32) -> Answer {
    Answer {
        challenge_id: challenge_id.to_string(),
        response: AnswerResponse::Text(text.to_string()),
        time_elapsed,
        hints_used,
    }
}

async fn grant_experience(store: &MemoryCharacterStore, user: &str, experience: u64) {
    store
        .update(
            user,
            CharacterUpdate {
                experience_delta: experience,
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn correct_answer_at_half_time_earns_time_bonus() {
    let h = harness();
    h.service.initialize_character("ada").await.unwrap();
    h.service.start_challenge("ada", "ng-mul-1").await.unwrap();

    let result = h
        .service
        .submit_answer("ada", "ng-mul-1", text_answer("ng-mul-1", "42", 30.0, 0))
        .await
        .unwrap();

    assert!(result.validation.is_correct);
    assert_eq!(result.score, 137);
    assert_eq!(result.experience_gained, 27);
    assert_eq!(
        result.rewards,
        vec![
            Reward::xp(20),
            Reward::gold(13, None),
            Reward::gold(6, Some("Perfect score bonus")),
        ]
    );

    let character = h.service.get_character("ada").await.unwrap();
    assert_eq!(character.experience, 47);
    assert_eq!(character.gold, 19);
    assert_eq!(character.level, 1);
    assert!(character.has_completed("ng-mul-1"));
    assert_eq!(character.unlocked_realms[0].progress, 12); // 1 of 8
}

#[tokio::test]
async fn two_hints_reduce_score_and_experience() {
    let h = harness();
    h.service.initialize_character("ada").await.unwrap();
    h.service.start_challenge("ada", "ng-mul-1").await.unwrap();

    let result = h
        .service
        .submit_answer("ada", "ng-mul-1", text_answer("ng-mul-1", "42", 30.0, 2))
        .await
        .unwrap();
    assert_eq!(result.score, 110);
    assert_eq!(result.experience_gained, 22);
}

#[tokio::test]
async fn submit_without_start_mutates_nothing() {
    let h = harness();
    let before = h.service.initialize_character("ada").await.unwrap();

    let err = h
        .service
        .submit_answer("ada", "ng-mul-1", text_answer("ng-mul-1", "42", 30.0, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::NoActiveAttempt { .. }));

    let after = h.service.get_character("ada").await.unwrap();
    assert_eq!(before, after, "no state mutated");
}

#[tokio::test]
async fn level_up_from_zero_unlocks_word_woods_once() {
    let h = harness();
    let character = h.service.initialize_character("ada").await.unwrap();
    assert_eq!(character.level, 1);
    assert_eq!(progression::level_for_experience(0), 1);

    grant_experience(&h.store, "ada", 400).await;
    let result = h.service.level_up("ada").await.unwrap();
    assert!(result.leveled_up);
    assert_eq!(result.previous_level, 1);
    assert_eq!(result.new_level, 3);
    assert_eq!(result.unlocked_realms, vec!["word-woods"]);

    let character = h.service.get_character("ada").await.unwrap();
    assert_eq!(character.level, 3);
    assert_eq!(character.gold, 150);
    assert!(character.has_unlocked("word-woods"));

    // Nothing changes on a repeat call
    let again = h.service.level_up("ada").await.unwrap();
    assert!(!again.leveled_up);
    let character = h.service.get_character("ada").await.unwrap();
    assert_eq!(character.gold, 150);
    assert_eq!(character.unlocked_realms.len(), 2);
}

#[tokio::test]
async fn level_gate_creates_no_attempt() {
    let h = harness();
    h.service.initialize_character("ada").await.unwrap();
    grant_experience(&h.store, "ada", 400).await;
    h.service.level_up("ada").await.unwrap();

    let err = h.service.start_challenge("ada", "ct-seq-1").await.unwrap_err();
    assert_eq!(err, GameError::LevelRequired { required: 5, current: 3 });
    assert!(err.is_eligibility());
    assert_eq!(h.service.tracker_summary().live, 0);
    assert!(h.service.attempt_stats("ada", "ct-seq-1").is_err());
}

#[tokio::test]
async fn locked_realm_is_distinct_from_level() {
    let h = harness();
    h.service.initialize_character("ada").await.unwrap();
    // Level 3 reached without the leveling path, so word-woods stays locked.
    h.store
        .update(
            "ada",
            CharacterUpdate {
                level: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = h.service.start_challenge("ada", "ww-syn-1").await.unwrap_err();
    assert_eq!(err, GameError::RealmLocked("word-woods".into()));
}

#[tokio::test]
async fn level_matches_derivation_after_level_up() {
    let h = harness();
    h.service.initialize_character("ada").await.unwrap();

    for grant in [0u64, 50, 60, 290, 1_000, 3_333, 10_000] {
        grant_experience(&h.store, "ada", grant).await;
        h.service.level_up("ada").await.unwrap();
        let character = h.service.get_character("ada").await.unwrap();
        assert_eq!(
            character.level,
            ((character.experience as f64 / 100.0).sqrt().floor() as u32) + 1
        );
    }
}

#[tokio::test]
async fn incorrect_answers_grant_nothing() {
    let h = harness();
    let before = h.service.initialize_character("ada").await.unwrap();
    h.service.start_challenge("ada", "ng-add-1").await.unwrap();

    let result = h
        .service
        .submit_answer("ada", "ng-add-1", text_answer("ng-add-1", "13", 5.0, 0))
        .await
        .unwrap();
    assert!(!result.validation.is_correct);
    assert!(result.rewards.is_empty());
    assert_eq!(result.experience_gained, 0);

    let after = h.service.get_character("ada").await.unwrap();
    assert_eq!(after.experience, before.experience);
    assert_eq!(after.gold, before.gold);
    assert!(!after.has_completed("ng-add-1"));
}

#[tokio::test]
async fn malformed_response_scores_zero_instead_of_failing() {
    let h = harness();
    h.service.initialize_character("ada").await.unwrap();
    h.service.start_challenge("ada", "ng-add-1").await.unwrap();

    let answer = Answer {
        challenge_id: "ng-add-1".into(),
        response: AnswerResponse::List(vec!["twelve".into()]),
        time_elapsed: 5.0,
        hints_used: 0,
    };
    let result = h.service.submit_answer("ada", "ng-add-1", answer).await.unwrap();
    assert_eq!(result.score, 0);
    assert!(result.validation.feedback.contains("expected"));
}

#[tokio::test]
async fn initialize_twice_keeps_one_unlock() {
    let h = harness();
    h.service.initialize_character("ada").await.unwrap();
    let character = h.service.initialize_character("ada").await.unwrap();
    assert_eq!(character.unlocked_realms.len(), 1);
}

#[tokio::test]
async fn unlock_then_current_realm_returns_the_starter() {
    let h = harness();
    h.service.initialize_character("ada").await.unwrap();
    h.engine
        .unlock_realm("ada", "number-grove")
        .await
        .unwrap();

    let realm = h.service.current_realm("ada").await.unwrap();
    assert_eq!(realm.id, "number-grove");
}

#[tokio::test]
async fn concurrent_double_submit_scores_once() {
    let h = Arc::new(harness());
    h.service.initialize_character("ada").await.unwrap();
    h.service.start_challenge("ada", "ng-add-1").await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let h = h.clone();
        handles.push(tokio::spawn(async move {
            h.service
                .submit_answer("ada", "ng-add-1", text_answer("ng-add-1", "12", 5.0, 0))
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(GameError::NoActiveAttempt { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(successes, 1);

    let character = h.service.get_character("ada").await.unwrap();
    // xp reward 10 + floor(score * 1 / 10)
    let expected_xp = 10 + u64::from(
        h.engine
            .calculate_score("ng-add-1", &text_answer("ng-add-1", "12", 5.0, 0))
            .unwrap(),
    ) / 10;
    assert_eq!(character.experience, expected_xp);
}

#[tokio::test]
async fn level_up_is_embedded_in_the_result() {
    let h = harness();
    h.service.initialize_character("ada").await.unwrap();
    grant_experience(&h.store, "ada", 95).await;

    h.service.start_challenge("ada", "ng-add-1").await.unwrap();
    let result = h
        .service
        .submit_answer("ada", "ng-add-1", text_answer("ng-add-1", "12", 5.0, 0))
        .await
        .unwrap();

    let level_up = result.level_up.expect("crossed 100 xp");
    assert_eq!(level_up.new_level, 2);
    assert_eq!(result.character.level, 2);
}

#[tokio::test]
async fn generated_challenge_follows_requested_difficulty() {
    let h = harness();
    h.service.initialize_character("ada").await.unwrap();

    let started = h
        .service
        .generate_challenge("ada", "number-grove", Some(1))
        .await
        .unwrap();
    assert_eq!(started.challenge.difficulty, 1);
    assert!(h
        .service
        .attempt_stats("ada", &started.challenge.id)
        .is_ok());

    // No explicit difficulty: the advisor recommends 1 at level 1
    let started = h
        .service
        .generate_challenge("ada", "number-grove", None)
        .await
        .unwrap();
    assert_eq!(started.challenge.difficulty, 1);
}

#[tokio::test]
async fn boss_victory_pays_once() {
    let h = harness();
    h.service.initialize_character("ada").await.unwrap();
    grant_experience(&h.store, "ada", 100).await;
    h.service.level_up("ada").await.unwrap();

    let started = h
        .service
        .start_boss("ada", "number-grove", "ng-boss-golem")
        .await
        .unwrap();
    assert_eq!(started.boss.stages.len(), 3);

    let answers = vec![
        text_answer("ng-mul-1", "42", 10.0, 0),
        text_answer("ng-div-1", "7", 10.0, 0),
        text_answer("ng-pct-1", "12", 10.0, 0),
    ];
    let gold_before = h.service.get_character("ada").await.unwrap().gold;
    let outcome = h
        .service
        .resolve_boss("ada", "number-grove", "ng-boss-golem", answers.clone())
        .await
        .unwrap();
    assert!(outcome.victory);
    assert!(outcome
        .character
        .achievements
        .iter()
        .any(|a| a.id == "boss-ng-boss-golem"));
    assert_eq!(outcome.character.gold, gold_before + 100);

    let err = h
        .service
        .resolve_boss("ada", "number-grove", "ng-boss-golem", answers)
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::NoActiveAttempt { .. }));
}

#[tokio::test]
async fn boss_defeat_changes_nothing() {
    let h = harness();
    h.service.initialize_character("ada").await.unwrap();
    grant_experience(&h.store, "ada", 100).await;
    h.service.level_up("ada").await.unwrap();
    let before = h.service.get_character("ada").await.unwrap();

    h.service
        .start_boss("ada", "number-grove", "ng-boss-golem")
        .await
        .unwrap();
    let outcome = h
        .service
        .resolve_boss(
            "ada",
            "number-grove",
            "ng-boss-golem",
            vec![text_answer("ng-mul-1", "42", 10.0, 0)],
        )
        .await
        .unwrap();
    assert!(!outcome.victory);
    assert!(outcome.rewards.is_empty());
    assert_eq!(outcome.stages.len(), 3);
    assert_eq!(h.service.get_character("ada").await.unwrap(), before);
}

#[tokio::test]
async fn boss_in_unknown_realm_is_not_found() {
    let h = harness();
    h.service.initialize_character("ada").await.unwrap();
    let err = h
        .service
        .start_boss("ada", "atlantis", "kraken")
        .await
        .unwrap_err();
    assert_eq!(err, GameError::RealmNotFound("atlantis".into()));

    let err = h
        .service
        .start_boss("ada", "number-grove", "kraken")
        .await
        .unwrap_err();
    assert_eq!(err, GameError::BossNotFound("kraken".into()));
}

struct FailingAnalytics {
    calls: AtomicUsize,
}

#[async_trait]
impl AnalyticsSink for FailingAnalytics {
    async fn record_attempt(
        &self,
        _user_id: &str,
        _challenge: &Challenge,
        _answer: &Answer,
        _result: &ChallengeResult,
    ) -> Result<(), GameError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GameError::Analytics("collector unavailable".into()))
    }

    async fn record_level_up(&self, _user_id: &str, _result: &LevelUpResult) -> Result<(), GameError> {
        Err(GameError::Analytics("collector unavailable".into()))
    }
}

struct StalledAnalytics;

#[async_trait]
impl AnalyticsSink for StalledAnalytics {
    async fn record_attempt(
        &self,
        _user_id: &str,
        _challenge: &Challenge,
        _answer: &Answer,
        _result: &ChallengeResult,
    ) -> Result<(), GameError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }

    async fn record_level_up(&self, _user_id: &str, _result: &LevelUpResult) -> Result<(), GameError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

#[tokio::test]
async fn failing_analytics_never_fails_the_submission() {
    let sink = Arc::new(FailingAnalytics {
        calls: AtomicUsize::new(0),
    });
    let h = harness_with(Some(sink.clone()));
    h.service.initialize_character("ada").await.unwrap();
    h.service.start_challenge("ada", "ng-add-1").await.unwrap();

    let result = h
        .service
        .submit_answer("ada", "ng-add-1", text_answer("ng-add-1", "12", 5.0, 0))
        .await;
    assert!(result.is_ok());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sink.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stalled_analytics_does_not_delay_the_submission() {
    let h = harness_with(Some(Arc::new(StalledAnalytics)));
    h.service.initialize_character("ada").await.unwrap();
    h.service.start_challenge("ada", "ng-add-1").await.unwrap();

    let started = Instant::now();
    let result = h
        .service
        .submit_answer("ada", "ng-add-1", text_answer("ng-add-1", "12", 5.0, 0))
        .await;
    assert!(result.is_ok());
    assert!(started.elapsed() < Duration::from_secs(5));
}
