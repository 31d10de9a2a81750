// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::GameError;
use crate::models::character::{Character, CharacterUpdate};
use crate::store::CharacterStore;

/// Process-local store used when no database is configured, and in tests.
#[derive(Debug, Default)]
pub struct MemoryCharacterStore {
    characters: RwLock<HashMap<String, Character>>,
}

impl MemoryCharacterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CharacterStore for MemoryCharacterStore {
    async fn get(&self, user_id: &str) -> Result<Option<Character>, GameError> {
        Ok(self.characters.read().await.get(user_id).cloned())
    }

    async fn create(&self, character: Character) -> Result<Character, GameError> {
        let mut characters = self.characters.write().await;
        let stored = characters
            .entry(character.user_id.clone())
            .or_insert(character);
        Ok(stored.clone())
    }

    async fn update(&self, user_id: &str, update: CharacterUpdate) -> Result<Character, GameError> {
        let mut characters = self.characters.write().await;
        let character = characters
            .get_mut(user_id)
            .ok_or_else(|| GameError::CharacterNotFound(user_id.to_string()))?;
        update.apply_to(character);
        Ok(character.clone())
    }
}
