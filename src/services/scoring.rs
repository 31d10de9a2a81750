// src/services/scoring.rs

//! Uniform score adjustments applied on top of a realm's raw 0-100 score.

use crate::config::{HINT_PENALTY, MAX_TIME_BONUS};

/// Guards against f64 products landing just below an integer boundary.
const FLOOR_EPSILON: f64 = 1e-9;

/// `clamp(0, 0.5, (1 - elapsed / limit) * 0.5)`; zero without a usable limit.
pub fn time_bonus(time_limit: Option<u32>, time_elapsed: f64) -> f64 {
    match time_limit {
        Some(limit) if limit > 0 => {
            let elapsed = time_elapsed.max(0.0);
            ((1.0 - elapsed / f64::from(limit)) * MAX_TIME_BONUS).clamp(0.0, MAX_TIME_BONUS)
        }
        _ => 0.0,
    }
}

/// `1 + (difficulty - 1) * 0.1`.
pub fn difficulty_multiplier(difficulty: u8) -> f64 {
    1.0 + f64::from(difficulty.saturating_sub(1)) * 0.1
}

/// `1 - hints * 0.1`, never below zero.
pub fn hint_factor(hints_used: u32) -> f64 {
    (1.0 - f64::from(hints_used) * HINT_PENALTY).max(0.0)
}

/// Final integer score.
///
/// Incorrect answers keep the raw realm score. Correct answers get the time
/// bonus, difficulty multiplier and hint penalty, and never drop below 1.
pub fn final_score(
    raw_score: f64,
    is_correct: bool,
    difficulty: u8,
    time_limit: Option<u32>,
    time_elapsed: f64,
    hints_used: u32,
) -> u32 {
    let raw = if raw_score.is_finite() {
        raw_score.max(0.0)
    } else {
        0.0
    };

    if !is_correct {
        return (raw + FLOOR_EPSILON).floor() as u32;
    }

    let adjusted = raw
        * difficulty_multiplier(difficulty)
        * (1.0 + time_bonus(time_limit, time_elapsed))
        * hint_factor(hints_used);

    ((adjusted + FLOOR_EPSILON).floor() as u32).max(1)
}
