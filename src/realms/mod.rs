// src/realms/mod.rs

//! Realm strategies: one implementation per mini-game family.
//!
//! The engine only talks to `dyn RealmStrategy` through the `RealmRegistry`;
//! adding a realm means implementing the trait and registering it at boot.

pub mod chrono_tower;
pub mod number_grove;
pub mod registry;
pub mod word_woods;

use std::collections::HashSet;
use std::sync::LazyLock;

use rand::seq::SliceRandom;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::GameError;
use crate::models::boss::{BossDefinition, BossResult};
use crate::models::challenge::{Answer, Challenge, ChallengeType, ValidationResult};
use crate::services::scoring;

pub use chrono_tower::ChronoTower;
pub use number_grove::NumberGrove;
pub use registry::RealmRegistry;
pub use word_woods::WordWoods;

/// Public description of a realm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RealmInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub required_level: u32,
    /// Challenge type handed to the difficulty advisor.
    pub primary_type: ChallengeType,
    #[serde(default)]
    pub challenge_count: usize,
}

/// Validation strategy and content source for one realm.
pub trait RealmStrategy: Send + Sync {
    fn info(&self) -> &RealmInfo;

    /// Full static catalogue.
    fn get_challenges(&self) -> &[Challenge];

    /// One challenge at `difficulty`, widening to ±1 and then to the first
    /// catalogue entry when nothing closer exists.
    fn generate_challenge(&self, difficulty: u8) -> Result<Challenge, GameError> {
        select_by_difficulty(self.get_challenges(), difficulty)
            .ok_or_else(|| GameError::Catalogue(format!("realm '{}' has no challenges", self.info().id)))
    }

    /// Realm-specific grading. Must not fail on malformed responses: those get
    /// a zero-score verdict describing the expected format.
    fn validate_answer(&self, challenge: &Challenge, answer: &Answer) -> ValidationResult;

    /// Side-effect-free score used for leaderboards and re-scoring.
    fn calculate_score(&self, challenge: &Challenge, answer: &Answer, time_elapsed: f64) -> u32;

    fn process_boss_challenge(&self, user_id: &str, boss_id: &str) -> Result<BossResult, GameError>;
}

/// On-disk catalogue layout shared by all bundled realms.
#[derive(Debug, Clone, Deserialize)]
pub struct RealmCatalogue {
    pub realm: RealmInfo,
    pub challenges: Vec<Challenge>,
    #[serde(default)]
    pub bosses: Vec<BossDefinition>,
}

/// Parses and checks a catalogue: every challenge valid and tagged with the
/// realm id, ids unique, boss stages pointing at real challenges.
pub fn load_catalogue(source: &str) -> Result<RealmCatalogue, GameError> {
    let mut catalogue: RealmCatalogue = serde_json::from_str(source)
        .map_err(|e| GameError::Catalogue(format!("failed to parse catalogue: {}", e)))?;

    let realm_id = catalogue.realm.id.clone();
    if catalogue.challenges.is_empty() {
        return Err(GameError::Catalogue(format!("realm '{}' has no challenges", realm_id)));
    }

    let mut seen = HashSet::new();
    for challenge in &mut catalogue.challenges {
        challenge.realm_id = realm_id.clone();
        challenge.validate().map_err(|e| {
            GameError::Catalogue(format!("challenge '{}' in '{}': {}", challenge.id, realm_id, e))
        })?;
        if !seen.insert(challenge.id.clone()) {
            return Err(GameError::Catalogue(format!(
                "duplicate challenge id '{}' in '{}'",
                challenge.id, realm_id
            )));
        }
    }

    for boss in &catalogue.bosses {
        if boss.stages.is_empty() {
            return Err(GameError::Catalogue(format!("boss '{}' has no stages", boss.id)));
        }
        if let Some(missing) = boss.stages.iter().find(|id| !seen.contains(*id)) {
            return Err(GameError::Catalogue(format!(
                "boss '{}' references unknown challenge '{}'",
                boss.id, missing
            )));
        }
    }

    catalogue.realm.challenge_count = catalogue.challenges.len();
    Ok(catalogue)
}

/// Exact difficulty first, then ±1, then the first catalogue entry.
/// Random among equally good candidates.
pub fn select_by_difficulty(catalogue: &[Challenge], difficulty: u8) -> Option<Challenge> {
    let mut rng = rand::thread_rng();

    let exact: Vec<&Challenge> = catalogue
        .iter()
        .filter(|c| c.difficulty == difficulty)
        .collect();
    if let Some(chosen) = exact.choose(&mut rng) {
        return Some((*chosen).clone());
    }

    let near: Vec<&Challenge> = catalogue
        .iter()
        .filter(|c| c.difficulty.abs_diff(difficulty) == 1)
        .collect();
    if let Some(chosen) = near.choose(&mut rng) {
        return Some((*chosen).clone());
    }

    catalogue.first().cloned()
}

/// Builds a boss encounter from a catalogue entry.
pub fn build_boss_result(
    realm_id: &str,
    challenges: &[Challenge],
    bosses: &[BossDefinition],
    boss_id: &str,
) -> Result<BossResult, GameError> {
    let boss = bosses
        .iter()
        .find(|b| b.id == boss_id)
        .ok_or_else(|| GameError::BossNotFound(boss_id.to_string()))?;

    let stages = boss
        .stages
        .iter()
        .map(|id| {
            challenges
                .iter()
                .find(|c| &c.id == id)
                .cloned()
                .ok_or_else(|| GameError::ChallengeNotFound(id.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BossResult {
        boss_id: boss.id.clone(),
        realm_id: realm_id.to_string(),
        name: boss.name.clone(),
        description: boss.description.clone(),
        required_level: boss.required_level,
        stages,
        victory_rewards: boss.victory_rewards.clone(),
    })
}

/// Applies the shared adjustments to a realm verdict.
pub fn adjusted_score(challenge: &Challenge, verdict: &ValidationResult, time_elapsed: f64, hints_used: u32) -> u32 {
    scoring::final_score(
        verdict.score,
        verdict.is_correct,
        challenge.difficulty,
        challenge.time_limit,
        time_elapsed,
        hints_used,
    )
}

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Lowercased, trimmed, inner whitespace collapsed, trailing punctuation dropped.
pub fn normalize_text(input: &str) -> String {
    let collapsed = WHITESPACE.replace_all(input.trim(), " ");
    collapsed
        .trim_end_matches(['.', '!', '?', ',', ';'])
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::challenge::ChallengeContent;
    use serde_json::json;

    fn challenge(id: &str, difficulty: u8) -> Challenge {
        Challenge {
            id: id.to_string(),
            realm_id: "test".into(),
            challenge_type: ChallengeType::Arithmetic,
            difficulty,
            title: id.to_string(),
            description: String::new(),
            content: ChallengeContent {
                question: "?".into(),
                answer: json!(1),
                hints: vec![],
                visual_aids: vec![],
            },
            time_limit: None,
            required_level: 1,
            rewards: vec![],
            metadata: json!(null),
        }
    }

    #[test]
    fn selection_prefers_exact_then_neighbours_then_first() {
        let pool = vec![challenge("a", 1), challenge("b", 3), challenge("c", 5)];
        assert_eq!(select_by_difficulty(&pool, 3).unwrap().id, "b");

        let widened = select_by_difficulty(&pool, 4).unwrap();
        assert!(widened.id == "b" || widened.id == "c");

        let pool = vec![challenge("far", 5), challenge("farther", 5)];
        assert_eq!(select_by_difficulty(&pool, 1).unwrap().id, "far");

        assert!(select_by_difficulty(&[], 3).is_none());
    }

    #[test]
    fn normalization_ignores_case_spacing_and_trailing_punctuation() {
        assert_eq!(normalize_text("  Lasting   a very\tshort TIME. "), "lasting a very short time");
        assert_eq!(normalize_text("On!"), "on");
    }

    #[test]
    fn catalogue_rejects_bad_content() {
        let no_challenges = r#"{"realm": {"id": "x", "name": "X", "description": "", "required_level": 1, "primary_type": "ordering"}, "challenges": []}"#;
        assert!(matches!(load_catalogue(no_challenges), Err(GameError::Catalogue(_))));

        let bad_difficulty = r#"{
            "realm": {"id": "x", "name": "X", "description": "", "required_level": 1, "primary_type": "arithmetic"},
            "challenges": [{"id": "x1", "type": "arithmetic", "difficulty": 9, "title": "t",
                            "content": {"question": "q", "answer": 1}}]
        }"#;
        assert!(matches!(load_catalogue(bad_difficulty), Err(GameError::Catalogue(_))));

        let bad_url = r#"{
            "realm": {"id": "x", "name": "X", "description": "", "required_level": 1, "primary_type": "arithmetic"},
            "challenges": [{"id": "x1", "type": "arithmetic", "difficulty": 1, "title": "t",
                            "content": {"question": "q", "answer": 1, "visual_aids": ["not a url"]}}]
        }"#;
        assert!(matches!(load_catalogue(bad_url), Err(GameError::Catalogue(_))));

        let dangling_boss = r#"{
            "realm": {"id": "x", "name": "X", "description": "", "required_level": 1, "primary_type": "arithmetic"},
            "challenges": [{"id": "x1", "type": "arithmetic", "difficulty": 1, "title": "t",
                            "content": {"question": "q", "answer": 1}}],
            "bosses": [{"id": "b", "name": "B", "stages": ["nope"]}]
        }"#;
        assert!(matches!(load_catalogue(dangling_boss), Err(GameError::Catalogue(_))));
    }

    #[test]
    fn unknown_boss_is_descriptive() {
        let err = build_boss_result("x", &[], &[], "missing").unwrap_err();
        assert_eq!(err, GameError::BossNotFound("missing".into()));
        assert_eq!(err.to_string(), "boss 'missing' not found");
    }
}
