// src/realms/word_woods.rs

use serde_json::{Value, json};

use crate::error::GameError;
use crate::models::boss::{BossDefinition, BossResult};
use crate::models::challenge::{Answer, AnswerResponse, Challenge, ValidationResult};
use crate::realms::{
    RealmInfo, RealmStrategy, adjusted_score, build_boss_result, load_catalogue, normalize_text,
};
use crate::utils::html::clean_html;

const CATALOGUE: &str = include_str!("../../data/realms/word_woods.json");

const EXPECTED_FORMAT: &str = "a single word or phrase as text";

/// Vocabulary realm. An answer payload is either one accepted string or a
/// list of accepted alternatives; comparison ignores case, spacing and
/// trailing punctuation.
pub struct WordWoods {
    info: RealmInfo,
    challenges: Vec<Challenge>,
    bosses: Vec<BossDefinition>,
}

impl WordWoods {
    pub fn new() -> Result<Self, GameError> {
        let catalogue = load_catalogue(CATALOGUE)?;
        for challenge in &catalogue.challenges {
            if accepted_answers(&challenge.content.answer).is_empty() {
                return Err(GameError::Catalogue(format!(
                    "challenge '{}' needs a text answer or a list of accepted answers",
                    challenge.id
                )));
            }
        }
        Ok(Self {
            info: catalogue.realm,
            challenges: catalogue.challenges,
            bosses: catalogue.bosses,
        })
    }

    fn grade(&self, challenge: &Challenge, response: &AnswerResponse) -> ValidationResult {
        let Some(given) = response.as_text() else {
            return ValidationResult::malformed(EXPECTED_FORMAT);
        };

        let accepted = accepted_answers(&challenge.content.answer);
        let Some(canonical) = accepted.first() else {
            tracing::error!("Challenge {} has no accepted answers", challenge.id);
            return ValidationResult::incorrect(0.0, "This challenge cannot be graded.", String::new());
        };

        let normalized = normalize_text(given);
        let echoed = clean_html(given.trim());
        let explanation = format!("The answer is '{}'.", canonical);

        if accepted.iter().any(|a| normalize_text(a) == normalized) {
            ValidationResult::correct(100.0, format!("Correct! '{}' it is.", echoed), explanation)
                .with_metadata(json!({ "normalized": normalized }))
        } else {
            ValidationResult::incorrect(0.0, format!("'{}' is not the word we were looking for.", echoed), explanation)
                .with_metadata(json!({ "normalized": normalized }))
        }
    }
}

fn accepted_answers(answer: &Value) -> Vec<String> {
    match answer {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

impl RealmStrategy for WordWoods {
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
