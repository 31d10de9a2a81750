// src/models/character.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable learner record. `level` is derived from `experience` and is only
/// ever written by the leveling path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Character {
    pub user_id: String,
    pub level: u32,
    pub experience: u64,
    pub gold: u64,
    pub unlocked_realms: Vec<RealmUnlock>,
    pub inventory: Vec<InventoryItem>,
    pub achievements: Vec<Achievement>,

    /// Ids of challenges answered correctly at least once.
    #[serde(default)]
    pub completed_challenges: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Character {
    /// Fresh level-1 character with nothing unlocked yet.
    pub fn new(user_id: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            level: 1,
            experience: 0,
            gold: 0,
            unlocked_realms: Vec::new(),
            inventory: Vec::new(),
            achievements: Vec::new(),
            completed_challenges: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_unlocked(&self, realm_id: &str) -> bool {
        self.unlocked_realms.iter().any(|r| r.realm_id == realm_id)
    }

    pub fn has_completed(&self, challenge_id: &str) -> bool {
        self.completed_challenges.iter().any(|c| c == challenge_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RealmUnlock {
    pub realm_id: String,
    pub unlocked_at: DateTime<Utc>,
    /// Completion percentage, 0..=100.
    pub progress: u8,
}

impl RealmUnlock {
    pub fn now(realm_id: &str) -> Self {
        Self {
            realm_id: realm_id.to_string(),
            unlocked_at: Utc::now(),
            progress: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub id: String,
    pub item_type: String,
    pub name: String,
    pub acquired_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Achievement {
    pub id: String,
    pub name: String,
    pub unlocked_at: DateTime<Utc>,
}

/// Partial, additive change set consumed by `CharacterStore::update`.
///
/// Counters are deltas, lists are appended; nothing here can reset existing
/// inventory, achievements or unlocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacterUpdate {
    pub experience_delta: u64,
    pub gold_delta: u64,
    /// Set only by the leveling path.
    pub level: Option<u32>,
    pub unlock_realms: Vec<RealmUnlock>,
    pub realm_progress: Vec<(String, u8)>,
    pub items: Vec<InventoryItem>,
    pub achievements: Vec<Achievement>,
    pub completed_challenges: Vec<String>,
}

impl CharacterUpdate {
    pub fn is_empty(&self) -> bool {
        *self == CharacterUpdate::default()
    }

    /// Applies the change set in place. Shared by every store so the
    /// merge semantics cannot drift between backends.
    pub fn apply_to(&self, character: &mut Character) {
        character.experience = character.experience.saturating_add(self.experience_delta);
        character.gold = character.gold.saturating_add(self.gold_delta);

        if let Some(level) = self.level {
            character.level = level;
        }

        for unlock in &self.unlock_realms {
            if !character.has_unlocked(&unlock.realm_id) {
                character.unlocked_realms.push(unlock.clone());
            }
        }

        for (realm_id, progress) in &self.realm_progress {
            if let Some(unlock) = character
                .unlocked_realms
                .iter_mut()
                .find(|r| &r.realm_id == realm_id)
            {
                unlock.progress = (*progress).min(100);
            }
        }

        character.inventory.extend(self.items.iter().cloned());

        for achievement in &self.achievements {
            if !character.achievements.iter().any(|a| a.id == achievement.id) {
                character.achievements.push(achievement.clone());
            }
        }

        for challenge_id in &self.completed_challenges {
            if !character.has_completed(challenge_id) {
                character.completed_challenges.push(challenge_id.clone());
            }
        }

        character.updated_at = Utc::now();
    }
}
