// src/models/boss.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::challenge::{
    Answer, AnswerResponse, Challenge, PublicChallenge, ValidationResult,
};
use crate::models::character::Character;
use crate::models::reward::{LevelUpResult, Reward};

/// Boss entry as declared in a realm catalogue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BossDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_boss_level")]
    pub required_level: u32,
    /// Catalogue challenge ids, in stage order.
    pub stages: Vec<String>,
    #[serde(default)]
    pub victory_rewards: Vec<Reward>,
}

fn default_boss_level() -> u32 {
    1
}

/// A resolved boss encounter: the stages to beat and what victory pays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BossResult {
    pub boss_id: String,
    pub realm_id: String,
    pub name: String,
    pub description: String,
    pub required_level: u32,
    pub stages: Vec<Challenge>,
    pub victory_rewards: Vec<Reward>,
}

/// Client view of a boss encounter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicBoss {
    pub boss_id: String,
    pub realm_id: String,
    pub name: String,
    pub description: String,
    pub required_level: u32,
    pub stages: Vec<PublicChallenge>,
    pub victory_rewards: Vec<Reward>,
}

impl From<&BossResult> for PublicBoss {
    fn from(b: &BossResult) -> Self {
        Self {
            boss_id: b.boss_id.clone(),
            realm_id: b.realm_id.clone(),
            name: b.name.clone(),
            description: b.description.clone(),
            required_level: b.required_level,
            stages: b.stages.iter().map(PublicChallenge::from).collect(),
            victory_rewards: b.victory_rewards.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BossStageResult {
    pub challenge_id: String,
    pub validation: ValidationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BossOutcome {
    pub boss_id: String,
    pub realm_id: String,
    pub victory: bool,
    pub stages: Vec<BossStageResult>,
    pub rewards: Vec<Reward>,
    pub level_up: Option<LevelUpResult>,
    pub character: Character,
}

//
// HTTP request DTOs
//

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BossStageAnswer {
    #[validate(length(min = 1))]
    pub challenge_id: String,

    #[validate(required(message = "response is required"))]
    #[serde(default)]
    pub response: Option<AnswerResponse>,

    #[validate(range(min = 0.0))]
    #[serde(default)]
    pub time_elapsed: f64,

    #[serde(default)]
    pub hints_used: u32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResolveBossRequest {
    #[validate(nested)]
    pub answers: Vec<BossStageAnswer>,
}

impl ResolveBossRequest {
    pub fn into_answers(self) -> Vec<Answer> {
        self.answers
            .into_iter()
            .filter_map(|a| {
                Some(Answer {
                    challenge_id: a.challenge_id,
                    response: a.response?,
                    time_elapsed: a.time_elapsed,
                    hints_used: a.hints_used,
                })
            })
            .collect()
    }
}
