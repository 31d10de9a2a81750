// src/models/attempt.rs

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::boss::PublicBoss;
use crate::models::challenge::PublicChallenge;

/// Ephemeral record of a challenge being worked on. Lives only inside the
/// attempt tracker; at most one per `(user_id, challenge_id)`.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub id: Uuid,
    pub user_id: String,
    pub challenge_id: String,
    pub started_at: DateTime<Utc>,
    pub started: Instant,
    pub last_activity: Instant,
    pub hints_used: u32,
}

impl Attempt {
    pub fn begin(user_id: &str, challenge_id: &str) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            challenge_id: challenge_id.to_string(),
            started_at: Utc::now(),
            started: now,
            last_activity: now,
            hints_used: 0,
        }
    }

    /// Wall-clock seconds since start, as observed by the server.
    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn stats(&self) -> AttemptStats {
        AttemptStats {
            attempt_id: self.id,
            user_id: self.user_id.clone(),
            challenge_id: self.challenge_id.clone(),
            started_at: self.started_at,
            elapsed_secs: self.elapsed_secs(),
            hints_used: self.hints_used,
        }
    }
}

/// How an attempt left the tracker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Completed,
    Abandoned,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptStats {
    pub attempt_id: Uuid,
    pub user_id: String,
    pub challenge_id: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub hints_used: u32,
}

/// Tracker-wide counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackerSummary {
    pub live: usize,
    pub started: u64,
    pub replaced: u64,
    pub completed: u64,
    pub abandoned: u64,
    pub expired: u64,
}

/// Reply to a hint request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HintResponse {
    pub challenge_id: String,
    pub index: usize,
    pub text: String,
    pub hints_used: u32,
    pub hints_remaining: usize,
}

/// Reply to starting or generating a challenge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StartedChallenge {
    pub attempt: AttemptStats,
    pub challenge: PublicChallenge,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StartedBoss {
    pub attempt: AttemptStats,
    pub boss: PublicBoss,
}
