// tests/postgres_store_tests.rs

//! Needs a running Postgres: `DATABASE_URL=... cargo test -- --ignored`

use std::sync::Arc;

use realm_academy::{
    error::GameError,
    models::character::{Character, CharacterUpdate, RealmUnlock},
    store::{CharacterStore, PgCharacterStore},
};
use sqlx::postgres::PgPoolOptions;

async fn store() -> PgCharacterStore {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");
    let store = PgCharacterStore::new(pool);
    store.migrate().await.expect("Failed to migrate database");
    store
}

fn unique_user() -> String {
    format!("pg-{}", uuid::Uuid::new_v4())
}

#[tokio::test]
#[ignore]
async fn create_get_and_update_round_trip() {
    let store = store().await;
    let user = unique_user();

    assert!(store.get(&user).await.unwrap().is_none());
    store.create(Character::new(&user)).await.unwrap();

    let updated = store
        .update(
            &user,
            CharacterUpdate {
                experience_delta: 120,
                gold_delta: 30,
                level: Some(2),
                unlock_realms: vec![RealmUnlock::now("number-grove")],
                completed_challenges: vec!["ng-add-1".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.level, 2);

    let stored = store.get(&user).await.unwrap().unwrap();
    assert_eq!(stored.experience, 120);
    assert_eq!(stored.gold, 30);
    assert_eq!(stored.unlocked_realms[0].realm_id, "number-grove");
    assert_eq!(stored.completed_challenges, vec!["ng-add-1"]);

    // Insert-if-absent keeps the existing record
    let again = store.create(Character::new(&user)).await.unwrap();
    assert_eq!(again.experience, 120);
}

#[tokio::test]
#[ignore]
async fn update_of_missing_character_fails() {
    let store = store().await;
    let err = store
        .update(&unique_user(), CharacterUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::CharacterNotFound(_)));
}

#[tokio::test]
#[ignore]
async fn concurrent_updates_are_serialized() {
    let store = Arc::new(store().await);
    let user = unique_user();
    store.create(Character::new(&user)).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let store = store.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            store
                .update(
                    &user,
                    CharacterUpdate {
                        gold_delta: 5,
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stored = store.get(&user).await.unwrap().unwrap();
    assert_eq!(stored.gold, 100);
}
