// src/services/attempts.rs

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::error::GameError;
use crate::models::attempt::{Attempt, AttemptOutcome, AttemptStats, TrackerSummary};

type AttemptKey = (String, String);

/// Live attempts keyed by `(user_id, challenge_id)`.
///
/// All operations take the map lock for their whole check-and-mutate step, so
/// `end` is an atomic remove: of two concurrent submissions only one gets the
/// attempt back.
#[derive(Debug, Default)]
pub struct AttemptTracker {
    attempts: Mutex<HashMap<AttemptKey, Attempt>>,
    started: AtomicU64,
    replaced: AtomicU64,
    completed: AtomicU64,
    abandoned: AtomicU64,
    expired: AtomicU64,
}

impl AttemptTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<AttemptKey, Attempt>> {
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key(user_id: &str, challenge_id: &str) -> AttemptKey {
        (user_id.to_string(), challenge_id.to_string())
    }

    /// Creates the attempt, replacing any live one for the same key.
    pub fn start(&self, user_id: &str, challenge_id: &str) -> Attempt {
        let attempt = Attempt::begin(user_id, challenge_id);
        let previous = self
            .lock()
            .insert(Self::key(user_id, challenge_id), attempt.clone());

        self.started.fetch_add(1, Ordering::Relaxed);
        if let Some(previous) = previous {
            self.replaced.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                "Attempt {} for {}/{} replaced by {}",
                previous.id,
                user_id,
                challenge_id,
                attempt.id
            );
        }
        attempt
    }

    /// Records that hint `hint_index` was dispensed. Monotonic: asking for an
    /// earlier or the same hint again does not raise the count.
    pub fn touch(&self, user_id: &str, challenge_id: &str, hint_index: usize) -> Result<u32, GameError> {
        let mut attempts = self.lock();
        let attempt = attempts
            .get_mut(&Self::key(user_id, challenge_id))
            .ok_or_else(|| no_active_attempt(user_id, challenge_id))?;

        let used = u32::try_from(hint_index.saturating_add(1)).unwrap_or(u32::MAX);
        attempt.hints_used = attempt.hints_used.max(used);
        attempt.last_activity = Instant::now();
        Ok(attempt.hints_used)
    }

    /// Atomically removes the attempt for submission. `None` when there is none.
    ///
    /// The caller settles it with `complete` once scored, or hands it back
    /// with `restore` when the submission was rejected.
    pub fn end(&self, user_id: &str, challenge_id: &str) -> Option<Attempt> {
        self.lock().remove(&Self::key(user_id, challenge_id))
    }

    pub fn complete(&self, attempt: &Attempt) {
        tracing::debug!("Attempt {} completed", attempt.id);
        self.record(AttemptOutcome::Completed);
    }

    /// Puts a rejected submission's attempt back, unless a new attempt was
    /// started for the same key in the meantime. Returns whether it went back.
    pub fn restore(&self, attempt: Attempt) -> bool {
        let key = Self::key(&attempt.user_id, &attempt.challenge_id);
        match self.lock().entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(attempt);
                true
            }
        }
    }

    pub fn abandon(&self, user_id: &str, challenge_id: &str) -> Result<Attempt, GameError> {
        let attempt = self
            .lock()
            .remove(&Self::key(user_id, challenge_id))
            .ok_or_else(|| no_active_attempt(user_id, challenge_id))?;
        self.record(AttemptOutcome::Abandoned);
        Ok(attempt)
    }

    pub fn get(&self, user_id: &str, challenge_id: &str) -> Option<AttemptStats> {
        self.lock()
            .get(&Self::key(user_id, challenge_id))
            .map(Attempt::stats)
    }

    pub fn summary(&self) -> TrackerSummary {
        TrackerSummary {
            live: self.lock().len(),
            started: self.started.load(Ordering::Relaxed),
            replaced: self.replaced.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
        }
    }

    /// Drops attempts idle for longer than `max_age`. Returns how many went.
    pub fn sweep_expired(&self, max_age: Duration) -> usize {
        self.sweep_expired_at(Instant::now(), max_age)
    }

    pub fn sweep_expired_at(&self, now: Instant, max_age: Duration) -> usize {
        let mut attempts = self.lock();
        let before = attempts.len();
        attempts.retain(|_, attempt| now.saturating_duration_since(attempt.last_activity) <= max_age);
        let removed = before - attempts.len();
        drop(attempts);

        for _ in 0..removed {
            self.record(AttemptOutcome::Expired);
        }
        removed
    }

    fn record(&self, outcome: AttemptOutcome) {
        let counter = match outcome {
            AttemptOutcome::Completed => &self.completed,
            AttemptOutcome::Abandoned => &self.abandoned,
            AttemptOutcome::Expired => &self.expired,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

pub(crate) fn no_active_attempt(user_id: &str, challenge_id: &str) -> GameError {
    GameError::NoActiveAttempt {
        user_id: user_id.to_string(),
        challenge_id: challenge_id.to_string(),
    }
}

/// Periodic sweep task. Runs until the returned handle is aborted.
pub fn spawn_attempt_sweeper(
    tracker: Arc<AttemptTracker>,
    every: Duration,
    max_age: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // First tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = tracker.sweep_expired(max_age);
            if removed > 0 {
                tracing::info!("Swept {} expired attempts", removed);
            }
        }
    })
}
