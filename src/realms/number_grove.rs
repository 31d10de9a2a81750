// src/realms/number_grove.rs

use serde_json::{Value, json};

use crate::error::GameError;
use crate::models::boss::{BossDefinition, BossResult};
use crate::models::challenge::{Answer, AnswerResponse, Challenge, ValidationResult};
use crate::realms::{RealmInfo, RealmStrategy, adjusted_score, build_boss_result, load_catalogue};

const CATALOGUE: &str = include_str!("../../data/realms/number_grove.json");

/// Absolute tolerance when a challenge declares none.
const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Relative error still counted as a near miss.
const NEAR_MISS_RATIO: f64 = 0.05;
const NEAR_MISS_SCORE: f64 = 50.0;

const EXPECTED_FORMAT: &str = "a number, e.g. \"42\" or 42";

/// Arithmetic realm: numeric answers with tolerance and near-miss partial credit.
pub struct NumberGrove {
    info: RealmInfo,
    challenges: Vec<Challenge>,
    bosses: Vec<BossDefinition>,
}

impl NumberGrove {
    pub fn new() -> Result<Self, GameError> {
        let catalogue = load_catalogue(CATALOGUE)?;
        for challenge in &catalogue.challenges {
            if challenge.content.answer.as_f64().is_none() {
                return Err(GameError::Catalogue(format!(
                    "challenge '{}' needs a numeric answer",
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
        let Some(expected) = challenge.content.answer.as_f64() else {
            tracing::error!("Challenge {} has a non-numeric answer payload", challenge.id);
            return ValidationResult::incorrect(0.0, "This challenge cannot be graded.", String::new());
        };

        let Some(given) = parse_number(response) else {
            return ValidationResult::malformed(EXPECTED_FORMAT);
        };

        let tolerance = challenge
            .metadata
            .get("tolerance")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_TOLERANCE);
        let difference = (given - expected).abs();
        let explanation = format!("{} = {}", challenge.content.question.trim_end_matches(" = ?"), format_number(expected));

        if difference <= tolerance {
            return ValidationResult::correct(100.0, "Correct!", explanation)
                .with_metadata(json!({ "difference": difference }));
        }

        let relative = if expected == 0.0 {
            f64::INFINITY
        } else {
            difference / expected.abs()
        };
        if relative <= NEAR_MISS_RATIO {
            return ValidationResult::incorrect(
                NEAR_MISS_SCORE,
                format!("So close! {} is just off.", format_number(given)),
                explanation,
            )
            .with_partial_credit(NEAR_MISS_SCORE / 100.0)
            .with_metadata(json!({ "difference": difference }));
        }

        ValidationResult::incorrect(
            0.0,
            format!("Not quite: {} is not the answer.", format_number(given)),
            explanation,
        )
        .with_metadata(json!({ "difference": difference }))
    }
}

fn parse_number(response: &AnswerResponse) -> Option<f64> {
    let value = match response {
        AnswerResponse::Structured(Value::Number(n)) => n.as_f64(),
        other => other
            .as_text()
            .map(|s| s.trim().replace([',', ' '], ""))
            .and_then(|s| s.parse::<f64>().ok()),
    }?;
    value.is_finite().then_some(value)
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl RealmStrategy for NumberGrove {
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
