// src/services/mod.rs

pub mod analytics;
pub mod attempts;
pub mod challenge;
pub mod difficulty;
pub mod engine;
pub mod progression;
pub mod scoring;

pub use analytics::{AnalyticsSink, TracingAnalytics};
pub use attempts::AttemptTracker;
pub use challenge::ChallengeService;
pub use difficulty::{DifficultyAdvisor, LevelScaledDifficulty};
pub use engine::GameEngine;
