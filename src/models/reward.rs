// src/models/reward.rs

use serde::{Deserialize, Serialize};

/// Write-only grant instruction, consumed immediately by a character update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reward {
    Xp {
        amount: u64,
    },
    Gold {
        amount: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Badge {
        item_id: String,
        description: String,
    },
    Item {
        item_id: String,
        description: String,
        #[serde(default = "default_item_type")]
        item_type: String,
    },
    /// `item_id` is the realm to unlock.
    Unlock {
        item_id: String,
        description: String,
    },
}

fn default_item_type() -> String {
    "collectible".to_string()
}

impl Reward {
    pub fn xp(amount: u64) -> Self {
        Reward::Xp { amount }
    }

    pub fn gold(amount: u64, description: Option<&str>) -> Self {
        Reward::Gold {
            amount,
            description: description.map(str::to_string),
        }
    }

    pub fn badge(item_id: &str, description: &str) -> Self {
        Reward::Badge {
            item_id: item_id.to_string(),
            description: description.to_string(),
        }
    }

    pub fn unlock(realm_id: &str, description: &str) -> Self {
        Reward::Unlock {
            item_id: realm_id.to_string(),
            description: description.to_string(),
        }
    }
}

/// Outcome of a level check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LevelUpResult {
    pub previous_level: u32,
    pub new_level: u32,
    pub leveled_up: bool,
    pub unlocked_realms: Vec<String>,
    pub rewards: Vec<Reward>,
}

impl LevelUpResult {
    pub fn unchanged(level: u32) -> Self {
        Self {
            previous_level: level,
            new_level: level,
            leveled_up: false,
            unlocked_realms: Vec::new(),
            rewards: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rewards_use_a_type_tag() {
        let reward = Reward::gold(12, Some("Perfect score bonus"));
        let value = serde_json::to_value(&reward).unwrap();
        assert_eq!(
            value,
            json!({"type": "gold", "amount": 12, "description": "Perfect score bonus"})
        );

        let item: Reward = serde_json::from_value(json!({
            "type": "item",
            "item_id": "abacus",
            "description": "A wooden abacus"
        }))
        .unwrap();
        assert_eq!(
            item,
            Reward::Item {
                item_id: "abacus".into(),
                description: "A wooden abacus".into(),
                item_type: "collectible".into(),
            }
        );
    }
}
