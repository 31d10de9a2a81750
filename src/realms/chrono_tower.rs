// src/realms/chrono_tower.rs

use serde_json::{Value, json};

use crate::error::GameError;
use crate::models::boss::{BossDefinition, BossResult};
use crate::models::challenge::{Answer, AnswerResponse, Challenge, ValidationResult};
use crate::realms::{
    RealmInfo, RealmStrategy, adjusted_score, build_boss_result, load_catalogue, normalize_text,
};

const CATALOGUE: &str = include_str!("../../data/realms/chrono_tower.json");

/// Ordering puzzles. Scored by how many positions match the expected sequence.
pub struct ChronoTower {
    info: RealmInfo,
    challenges: Vec<Challenge>,
    bosses: Vec<BossDefinition>,
}

impl ChronoTower {
    pub fn new() -> Result<Self, GameError> {
        let catalogue = load_catalogue(CATALOGUE)?;
        for challenge in &catalogue.challenges {
            match expected_sequence(&challenge.content.answer) {
                Some(seq) if seq.len() >= 2 => {}
                _ => {
                    return Err(GameError::Catalogue(format!(
                        "challenge '{}' needs an answer list of at least two entries",
                        challenge.id
                    )));
                }
            }
        }
        Ok(Self {
            info: catalogue.realm,
            challenges: catalogue.challenges,
            bosses: catalogue.bosses,
        })
    }

    fn grade(&self, challenge: &Challenge, response: &AnswerResponse) -> ValidationResult {
        let Some(expected) = expected_sequence(&challenge.content.answer) else {
            tracing::error!("Challenge {} has no ordered answer", challenge.id);
            return ValidationResult::incorrect(0.0, "This challenge cannot be graded.", String::new());
        };
        let expected_format = format!("a list of {} items in order", expected.len());

        let Some(given) = given_sequence(response) else {
            return ValidationResult::malformed(&expected_format);
        };
        if given.len() != expected.len() {
            return ValidationResult::malformed(&expected_format);
        }

        let matches = expected
            .iter()
            .zip(&given)
            .filter(|(want, got)| normalize_text(want) == normalize_text(got))
            .count();
        let total = expected.len();
        let fraction = matches as f64 / total as f64;
        let explanation = format!("The correct order is: {}.", expected.join(" → "));
        let metadata = json!({ "correct_positions": matches, "total_positions": total });

        if matches == total {
            ValidationResult::correct(100.0, "Perfect timeline!", explanation).with_metadata(metadata)
        } else {
            ValidationResult::incorrect(
                fraction * 100.0,
                format!("{} of {} in the right place.", matches, total),
                explanation,
            )
            .with_partial_credit(fraction)
            .with_metadata(metadata)
        }
    }
}

fn expected_sequence(answer: &Value) -> Option<Vec<String>> {
    answer
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

fn given_sequence(response: &AnswerResponse) -> Option<Vec<String>> {
    match response {
        AnswerResponse::List(items) => Some(items.clone()),
        AnswerResponse::Structured(value) => expected_sequence(value),
        AnswerResponse::Text(_) => None,
    }
}

impl RealmStrategy for ChronoTower {
    fn info(&self) -> &RealmInfo {
        &self.info
    }

    fn get_challenges(&self) -> &[Challenge] {
        &self.challenges
    }

    fn validate_answer(&self, challenge: &Challenge, answer: &Answer) -> ValidationResult {
        self.grade(challenge, &answer.response)
    }

    fn calculate_score(&self, challenge: &Challenge, answer: &Answer, time_elapsed: f64) -> u32 {
        let verdict = self.grade(challenge, &answer.response);
        adjusted_score(challenge, &verdict, time_elapsed, answer.hints_used)
    }

    fn process_boss_challenge(&self, user_id: &str, boss_id: &str) -> Result<BossResult, GameError> {
        tracing::debug!("User {} summons boss {} in {}", user_id, boss_id, self.info.id);
        build_boss_result(&self.info.id, &self.challenges, &self.bosses, boss_id)
    }
}
