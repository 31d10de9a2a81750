// src/config.rs

use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;

/// Realm every new character starts in.
pub const STARTER_REALM_ID: &str = "number-grove";

/// Gold granted on level-up is `new_level * LEVEL_UP_GOLD_PER_LEVEL`.
pub const LEVEL_UP_GOLD_PER_LEVEL: u64 = 50;

/// A badge is granted for every level divisible by this.
pub const LEVEL_BADGE_INTERVAL: u32 = 5;

/// Each hint used removes this fraction of the final score.
pub const HINT_PENALTY: f64 = 0.1;

/// Upper bound of the time bonus (50%).
pub const MAX_TIME_BONUS: f64 = 0.5;

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;

const DEFAULT_ATTEMPT_MAX_AGE_SECS: u64 = 60 * 60;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5 * 60;
/// Budget for one fire-and-forget analytics call.
pub const DEFAULT_ANALYTICS_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres URL; the in-memory character store is used when absent.
    pub database_url: Option<String>,
    pub rust_log: String,
    pub port: u16,
    pub log_dir: String,
    pub attempt_max_age: Duration,
    pub sweep_interval: Duration,
    pub analytics_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            rust_log: "info".to_string(),
            port: 3000,
            log_dir: "logs".to_string(),
            attempt_max_age: Duration::from_secs(DEFAULT_ATTEMPT_MAX_AGE_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            analytics_timeout: Duration::from_millis(DEFAULT_ANALYTICS_TIMEOUT_MS),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        Self {
            database_url,
            rust_log,
            port: parse_var("PORT", 3000),
            log_dir,
            attempt_max_age: Duration::from_secs(parse_var(
                "ATTEMPT_MAX_AGE_SECS",
                DEFAULT_ATTEMPT_MAX_AGE_SECS,
            )),
            sweep_interval: Duration::from_secs(parse_var(
                "SWEEP_INTERVAL_SECS",
                DEFAULT_SWEEP_INTERVAL_SECS,
            )),
            analytics_timeout: Duration::from_millis(parse_var(
                "ANALYTICS_TIMEOUT_MS",
                DEFAULT_ANALYTICS_TIMEOUT_MS,
            )),
        }
    }
}

fn parse_var<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("{} has invalid value '{}', using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
