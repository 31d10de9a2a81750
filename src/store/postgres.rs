// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};

use crate::error::GameError;
use crate::models::character::{
    Achievement, Character, CharacterUpdate, InventoryItem, RealmUnlock,
};
use crate::store::CharacterStore;

const CHARACTER_COLUMNS: &str = "user_id, level, experience, gold, unlocked_realms, \
     inventory, achievements, completed_challenges, created_at, updated_at";

/// Represents the 'characters' table in the database.
/// List fields are stored as JSONB arrays.
#[derive(Debug, FromRow)]
struct CharacterRow {
    user_id: String,
    level: i32,
    experience: i64,
    gold: i64,
    unlocked_realms: Json<Vec<RealmUnlock>>,
    inventory: Json<Vec<InventoryItem>>,
    achievements: Json<Vec<Achievement>>,
    completed_challenges: Json<Vec<String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CharacterRow> for Character {
    type Error = GameError;

    fn try_from(row: CharacterRow) -> Result<Self, Self::Error> {
        let corrupt = |field: &str| {
            GameError::Storage(format!("character '{}' has a negative {}", row.user_id, field))
        };
        Ok(Character {
            level: u32::try_from(row.level).map_err(|_| corrupt("level"))?,
            experience: u64::try_from(row.experience).map_err(|_| corrupt("experience"))?,
            gold: u64::try_from(row.gold).map_err(|_| corrupt("gold"))?,
            user_id: row.user_id,
            unlocked_realms: row.unlocked_realms.0,
            inventory: row.inventory.0,
            achievements: row.achievements.0,
            completed_challenges: row.completed_challenges.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn to_db_int<T: TryInto<i64>>(value: T, field: &str) -> Result<i64, GameError> {
    value
        .try_into()
        .map_err(|_| GameError::Storage(format!("{} out of range", field)))
}

/// Postgres-backed store. Each update is a `SELECT ... FOR UPDATE` transaction.
#[derive(Debug, Clone)]
pub struct PgCharacterStore {
    pool: PgPool,
}

impl PgCharacterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), GameError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl CharacterStore for PgCharacterStore {
    async fn get(&self, user_id: &str) -> Result<Option<Character>, GameError> {
        let sql = format!("SELECT {} FROM characters WHERE user_id = $1", CHARACTER_COLUMNS);
        let row = sqlx::query_as::<_, CharacterRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch character {}: {:?}", user_id, e);
                GameError::from(e)
            })?;

        row.map(Character::try_from).transpose()
    }

    async fn create(&self, character: Character) -> Result<Character, GameError> {
        sqlx::query(
            r#"
            INSERT INTO characters
                (user_id, level, experience, gold, unlocked_realms, inventory,
                 achievements, completed_challenges, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(&character.user_id)
        .bind(i32::try_from(character.level).map_err(|_| GameError::Storage("level out of range".into()))?)
        .bind(to_db_int(character.experience, "experience")?)
        .bind(to_db_int(character.gold, "gold")?)
        .bind(Json(&character.unlocked_realms))
        .bind(Json(&character.inventory))
        .bind(Json(&character.achievements))
        .bind(Json(&character.completed_challenges))
        .bind(character.created_at)
        .bind(character.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert character {}: {:?}", character.user_id, e);
            GameError::from(e)
        })?;

        self.get(&character.user_id)
            .await?
            .ok_or_else(|| GameError::Storage(format!("character '{}' vanished after insert", character.user_id)))
    }

    async fn update(&self, user_id: &str, update: CharacterUpdate) -> Result<Character, GameError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "SELECT {} FROM characters WHERE user_id = $1 FOR UPDATE",
            CHARACTER_COLUMNS
        );
        let row = sqlx::query_as::<_, CharacterRow>(&sql)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| GameError::CharacterNotFound(user_id.to_string()))?;

        let mut character = Character::try_from(row)?;
        update.apply_to(&mut character);

        sqlx::query(
            r#"
            UPDATE characters SET
                level = $2,
                experience = $3,
                gold = $4,
                unlocked_realms = $5,
                inventory = $6,
                achievements = $7,
                completed_challenges = $8,
                updated_at = $9
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(i32::try_from(character.level).map_err(|_| GameError::Storage("level out of range".into()))?)
        .bind(to_db_int(character.experience, "experience")?)
        .bind(to_db_int(character.gold, "gold")?)
        .bind(Json(&character.unlocked_realms))
        .bind(Json(&character.inventory))
        .bind(Json(&character.achievements))
        .bind(Json(&character.completed_challenges))
        .bind(character.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update character {}: {:?}", user_id, e);
            GameError::from(e)
        })?;

        tx.commit().await?;
        Ok(character)
    }
}
