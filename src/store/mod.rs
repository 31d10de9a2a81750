// src/store/mod.rs

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::GameError;
use crate::models::character::{Character, CharacterUpdate};

pub use memory::MemoryCharacterStore;
pub use postgres::PgCharacterStore;

/// Durable character persistence.
///
/// `update` must apply the whole change set atomically for one user; callers
/// that read, compute and then write additionally hold the engine's per-user lock.
#[async_trait]
pub trait CharacterStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<Character>, GameError>;

    /// Inserts `character` unless one already exists for its user id.
    /// Returns whatever is stored afterwards.
    async fn create(&self, character: Character) -> Result<Character, GameError>;

    /// Applies `update` and returns the stored character.
    /// Fails with `CharacterNotFound` when the user has no record.
    async fn update(&self, user_id: &str, update: CharacterUpdate) -> Result<Character, GameError>;
}
