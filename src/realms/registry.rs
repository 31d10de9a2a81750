// src/realms/registry.rs

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::GameError;
use crate::models::challenge::Challenge;
use crate::realms::{ChronoTower, NumberGrove, RealmInfo, RealmStrategy, WordWoods};

/// Realm id → strategy, populated once at boot.
///
/// Challenge ids are unique across every registered realm, so a challenge can
/// be resolved without knowing its realm.
#[derive(Default, Clone)]
pub struct RealmRegistry {
    realms: HashMap<String, Arc<dyn RealmStrategy>>,
    order: Vec<String>,
    challenge_index: HashMap<String, String>,
}

impl RealmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the bundled realms. Fails fast on invalid content.
    pub fn with_default_realms() -> Result<Self, GameError> {
        let mut registry = Self::new();
        registry.register(Arc::new(NumberGrove::new()?))?;
        registry.register(Arc::new(WordWoods::new()?))?;
        registry.register(Arc::new(ChronoTower::new()?))?;
        Ok(registry)
    }

    pub fn register(&mut self, realm: Arc<dyn RealmStrategy>) -> Result<(), GameError> {
        let realm_id = realm.info().id.clone();
        if self.realms.contains_key(&realm_id) {
            return Err(GameError::Catalogue(format!("realm '{}' registered twice", realm_id)));
        }
        if realm.get_challenges().is_empty() {
            return Err(GameError::Catalogue(format!("realm '{}' has no challenges", realm_id)));
        }

        let mut index = Vec::with_capacity(realm.get_challenges().len());
        for challenge in realm.get_challenges() {
            if let Some(owner) = self.challenge_index.get(&challenge.id) {
                return Err(GameError::Catalogue(format!(
                    "challenge id '{}' in '{}' is already used by '{}'",
                    challenge.id, realm_id, owner
                )));
            }
            index.push((challenge.id.clone(), realm_id.clone()));
        }

        tracing::info!(
            "Registered realm {} with {} challenges",
            realm_id,
            realm.get_challenges().len()
        );
        self.challenge_index.extend(index);
        self.order.push(realm_id.clone());
        self.realms.insert(realm_id, realm);
        Ok(())
    }

    pub fn get(&self, realm_id: &str) -> Result<Arc<dyn RealmStrategy>, GameError> {
        self.realms
            .get(realm_id)
            .cloned()
            .ok_or_else(|| GameError::RealmNotFound(realm_id.to_string()))
    }

    pub fn contains(&self, realm_id: &str) -> bool {
        self.realms.contains_key(realm_id)
    }

    /// Realm infos in registration order.
    pub fn list(&self) -> Vec<RealmInfo> {
        self.order
            .iter()
            .filter_map(|id| self.realms.get(id))
            .map(|realm| realm.info().clone())
            .collect()
    }

    /// Resolves a challenge id to its owning realm and definition.
    pub fn find_challenge(
        &self,
        challenge_id: &str,
    ) -> Result<(Arc<dyn RealmStrategy>, Challenge), GameError> {
        let not_found = || GameError::ChallengeNotFound(challenge_id.to_string());
        let realm_id = self.challenge_index.get(challenge_id).ok_or_else(not_found)?;
        let realm = self.get(realm_id)?;
        let challenge = realm
            .get_challenges()
            .iter()
            .find(|c| c.id == challenge_id)
            .cloned()
            .ok_or_else(not_found)?;
        Ok((realm, challenge))
    }
}
