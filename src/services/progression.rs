// src/services/progression.rs

//! Reward and leveling rules. Everything here is pure: callers persist the
//! returned `CharacterUpdate` through the store.

use chrono::Utc;

use crate::config::{LEVEL_BADGE_INTERVAL, LEVEL_UP_GOLD_PER_LEVEL};
use crate::models::challenge::{Challenge, ValidationResult};
use crate::models::character::{Achievement, Character, CharacterUpdate, InventoryItem, RealmUnlock};
use crate::models::reward::{LevelUpResult, Reward};

/// Level → realms that open at that level.
pub const REALM_UNLOCKS: &[(u32, &[&str])] = &[
    (1, &["number-grove"]),
    (3, &["word-woods"]),
    (5, &["chrono-tower"]),
];

/// `floor(sqrt(experience / 100)) + 1`.
pub fn level_for_experience(experience: u64) -> u32 {
    let level = (experience / 100).isqrt() + 1;
    u32::try_from(level).unwrap_or(u32::MAX)
}

/// Rewards for one validated answer. `score` is the final adjusted score.
///
/// Incorrect answers earn nothing. Correct ones earn `difficulty * 10` xp,
/// `floor(difficulty * 5 * score / 100)` gold, half that again on a perfect
/// score, plus the challenge's own rewards.
pub fn calculate_rewards(challenge: &Challenge, validation: &ValidationResult, score: u32) -> Vec<Reward> {
    if !validation.is_correct {
        return Vec::new();
    }

    let difficulty = u64::from(challenge.difficulty);
    let mut rewards = vec![Reward::xp(difficulty * 10)];

    let gold = difficulty * 5 * u64::from(score) / 100;
    if gold > 0 {
        rewards.push(Reward::gold(gold, None));
    }
    if score >= 100 {
        let bonus = gold / 2;
        if bonus > 0 {
            rewards.push(Reward::gold(bonus, Some("Perfect score bonus")));
        }
    }

    rewards.extend(challenge.rewards.iter().cloned());
    rewards
}

/// Translates rewards into an additive change set.
pub fn apply_rewards(rewards: &[Reward]) -> CharacterUpdate {
    let now = Utc::now();
    let mut update = CharacterUpdate::default();

    for reward in rewards {
        match reward {
            Reward::Xp { amount } => {
                update.experience_delta = update.experience_delta.saturating_add(*amount);
            }
            Reward::Gold { amount, .. } => {
                update.gold_delta = update.gold_delta.saturating_add(*amount);
            }
            Reward::Badge { item_id, description } => update.achievements.push(Achievement {
                id: item_id.clone(),
                name: description.clone(),
                unlocked_at: now,
            }),
            Reward::Item {
                item_id,
                description,
                item_type,
            } => update.items.push(InventoryItem {
                id: item_id.clone(),
                item_type: item_type.clone(),
                name: description.clone(),
                acquired_at: now,
            }),
            Reward::Unlock { item_id, .. } => update.unlock_realms.push(RealmUnlock {
                realm_id: item_id.clone(),
                unlocked_at: now,
                progress: 0,
            }),
        }
    }

    update
}

/// Realms open at `level` according to `REALM_UNLOCKS`.
pub fn realms_for_level(level: u32) -> impl Iterator<Item = &'static str> {
    REALM_UNLOCKS
        .iter()
        .filter(move |(threshold, _)| *threshold <= level)
        .flat_map(|(_, realms)| realms.iter().copied())
}

/// Level check for a stored character.
///
/// Compares the derived level with the stored one. On an increase, returns the
/// new level, a `level * 50` gold bonus, a badge for every crossed multiple of
/// five, and unlock rewards for eligible realms the character lacks.
/// `is_registered` filters out realms this deployment does not serve.
pub fn level_up_changes(
    character: &Character,
    is_registered: impl Fn(&str) -> bool,
) -> (LevelUpResult, CharacterUpdate) {
    let previous = character.level;
    let derived = level_for_experience(character.experience);
    if derived <= previous {
        return (LevelUpResult::unchanged(previous), CharacterUpdate::default());
    }

    let mut rewards = vec![Reward::gold(
        u64::from(derived) * LEVEL_UP_GOLD_PER_LEVEL,
        Some(&format!("Level {} bonus", derived)),
    )];

    for level in (previous + 1)..=derived {
        if level % LEVEL_BADGE_INTERVAL == 0 {
            rewards.push(Reward::badge(
                &format!("level-{}", level),
                &format!("Reached level {}", level),
            ));
        }
    }

    let mut unlocked = Vec::new();
    for realm_id in realms_for_level(derived) {
        if !character.has_unlocked(realm_id) && is_registered(realm_id) && !unlocked.contains(&realm_id) {
            unlocked.push(realm_id);
            rewards.push(Reward::unlock(realm_id, &format!("Unlocked at level {}", derived)));
        }
    }

    let mut update = apply_rewards(&rewards);
    update.level = Some(derived);

    let result = LevelUpResult {
        previous_level: previous,
        new_level: derived,
        leveled_up: true,
        unlocked_realms: unlocked.into_iter().map(str::to_string).collect(),
        rewards,
    };
    (result, update)
}

/// Completion percentage of a realm, given every challenge id the character
/// has completed and the realm's catalogue.
pub fn realm_progress<'a>(completed: impl IntoIterator<Item = &'a str>, catalogue: &[Challenge]) -> u8 {
    if catalogue.is_empty() {
        return 0;
    }
    let mut done: Vec<&str> = completed
        .into_iter()
        .filter(|id| catalogue.iter().any(|c| c.id == *id))
        .collect();
    done.sort_unstable();
    done.dedup();
    let percent = done.len() * 100 / catalogue.len();
    percent.min(100) as u8
}
