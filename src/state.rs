// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::config::Config;
use crate::services::ChallengeService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ChallengeService>,
    pub config: Config,
}

impl FromRef<AppState> for Arc<ChallengeService> {
    fn from_ref(state: &AppState) -> Self {
        state.service.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
