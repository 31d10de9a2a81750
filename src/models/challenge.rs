// src/models/challenge.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;
use validator::Validate;

use crate::models::character::Character;
use crate::models::reward::{LevelUpResult, Reward};

/// Mini-game kind. Each realm owns one or more of these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeType {
    Arithmetic,
    MultipleChoice,
    FillBlank,
    Ordering,
}

/// Immutable exercise definition created by a realm.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Challenge {
    #[validate(length(min = 1, max = 64))]
    pub id: String,

    /// Filled in by the owning realm when its catalogue is loaded.
    #[serde(default)]
    pub realm_id: String,

    #[serde(rename = "type")]
    pub challenge_type: ChallengeType,

    #[validate(range(min = 1, max = 5))]
    pub difficulty: u8,

    #[validate(length(min = 1, max = 120))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[validate(nested)]
    pub content: ChallengeContent,

    /// Seconds; no time bonus applies without one.
    #[serde(default)]
    pub time_limit: Option<u32>,

    #[serde(default = "default_required_level")]
    #[validate(range(min = 1))]
    pub required_level: u32,

    /// Granted verbatim on every correct answer.
    #[serde(default)]
    pub rewards: Vec<Reward>,

    /// Realm-owned payload (options, tolerances...). The engine never reads it.
    #[serde(default)]
    pub metadata: Value,
}

fn default_required_level() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ChallengeContent {
    #[validate(length(min = 1, max = 2000))]
    pub question: String,

    /// Correct-answer payload, interpreted by the owning realm only.
    pub answer: Value,

    /// Ordered; hint `i` is dispensed by index.
    #[serde(default)]
    pub hints: Vec<String>,

    #[serde(default)]
    #[validate(custom(function = validate_visual_aids))]
    pub visual_aids: Vec<String>,
}

/// Validates a collection of visual aid URLs.
fn validate_visual_aids(urls: &[String]) -> Result<(), validator::ValidationError> {
    for url in urls {
        if url.len() > 500 {
            return Err(validator::ValidationError::new("url_too_long"));
        }
        if Url::parse(url).is_err() {
            return Err(validator::ValidationError::new("invalid_url"));
        }
    }
    Ok(())
}

impl Challenge {
    pub fn hint_count(&self) -> usize {
        self.content.hints.len()
    }
}

/// DTO for sending a challenge to the client (answer payload and hint texts hidden).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicChallenge {
    pub id: String,
    pub realm_id: String,
    #[serde(rename = "type")]
    pub challenge_type: ChallengeType,
    pub difficulty: u8,
    pub title: String,
    pub description: String,
    pub question: String,
    pub visual_aids: Vec<String>,
    pub hint_count: usize,
    pub time_limit: Option<u32>,
    pub required_level: u32,
    pub metadata: Value,
}

impl From<&Challenge> for PublicChallenge {
    fn from(c: &Challenge) -> Self {
        Self {
            id: c.id.clone(),
            realm_id: c.realm_id.clone(),
            challenge_type: c.challenge_type,
            difficulty: c.difficulty,
            title: c.title.clone(),
            description: c.description.clone(),
            question: c.content.question.clone(),
            visual_aids: c.content.visual_aids.clone(),
            hint_count: c.hint_count(),
            time_limit: c.time_limit,
            required_level: c.required_level,
            metadata: c.metadata.clone(),
        }
    }
}

/// Learner response payload; its shape depends on the challenge type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnswerResponse {
    Text(String),
    List(Vec<String>),
    Structured(Value),
}

impl AnswerResponse {
    pub fn is_blank(&self) -> bool {
        match self {
            AnswerResponse::Text(s) => s.trim().is_empty(),
            AnswerResponse::List(items) => items.is_empty(),
            AnswerResponse::Structured(v) => v.is_null(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerResponse::Text(s) => Some(s),
            AnswerResponse::Structured(Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub challenge_id: String,
    pub response: AnswerResponse,
    /// Seconds.
    pub time_elapsed: f64,
    pub hints_used: u32,
}

/// Realm verdict on one answer. `score` is the realm's raw 0-100 correctness score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationResult {
    pub is_correct: bool,
    pub score: f64,
    pub feedback: String,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_credit: Option<f64>,
    /// Realm-owned annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ValidationResult {
    pub fn correct(score: f64, feedback: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            is_correct: true,
            score: score.clamp(0.0, 100.0),
            feedback: feedback.into(),
            explanation: explanation.into(),
            partial_credit: None,
            metadata: None,
        }
    }

    pub fn incorrect(score: f64, feedback: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            is_correct: false,
            ..Self::correct(score, feedback, explanation)
        }
    }

    /// Zero-score verdict for a response whose shape the realm cannot read.
    pub fn malformed(expected_format: &str) -> Self {
        Self::incorrect(
            0.0,
            format!("Unrecognized answer format: expected {}", expected_format),
            String::new(),
        )
    }

    pub fn with_partial_credit(mut self, credit: f64) -> Self {
        self.partial_credit = Some(credit.clamp(0.0, 1.0));
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Outcome of a submitted answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChallengeResult {
    pub challenge_id: String,
    pub realm_id: String,
    pub validation: ValidationResult,
    /// Final score after time, difficulty and hint adjustments.
    pub score: u32,
    pub rewards: Vec<Reward>,
    /// `floor(score * difficulty / 10)` on a correct answer, on top of xp rewards.
    pub experience_gained: u64,
    pub answer: Answer,
    pub level_up: Option<LevelUpResult>,
    pub character: Character,
}

//
// HTTP request DTOs
//

/// DTO for submitting an answer to a started challenge.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(required(message = "response is required"))]
    #[serde(default)]
    pub response: Option<AnswerResponse>,

    #[validate(range(min = 0.0, message = "time_elapsed must be non-negative"))]
    #[serde(default)]
    pub time_elapsed: f64,

    #[serde(default)]
    pub hints_used: u32,
}

impl SubmitAnswerRequest {
    /// Converts into an `Answer`; `None` when the response is missing.
    pub fn into_answer(self, challenge_id: &str) -> Option<Answer> {
        Some(Answer {
            challenge_id: challenge_id.to_string(),
            response: self.response?,
            time_elapsed: self.time_elapsed,
            hints_used: self.hints_used,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct GenerateChallengeRequest {
    #[validate(range(min = 1, max = 5))]
    #[serde(default)]
    pub difficulty: Option<u8>,
}
