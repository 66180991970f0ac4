//! Nullable store — thread-safe in-memory challenge storage for testing.

use arena_store::{ChallengeStore, StoreError, Versioned};
use arena_types::{Challenge, ChallengeId, Timestamp};
use std::collections::HashMap;
use std::sync::Mutex;

/// An in-memory challenge store for testing.
///
/// Versioning matches the production backend: inserts start at version 1
/// and conditional writes are checked and applied under one lock, so racy
/// writers observe the same conflicts they would against LMDB.
pub struct NullChallengeStore {
    challenges: Mutex<HashMap<String, Versioned<Challenge>>>,
}

impl NullChallengeStore {
    pub fn new() -> Self {
        Self {
            challenges: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for NullChallengeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChallengeStore for NullChallengeStore {
    fn insert(&self, challenge: &Challenge) -> Result<u64, StoreError> {
        let mut map = self.challenges.lock().unwrap();
        let key = challenge.id.to_string();
        if map.contains_key(&key) {
            return Err(StoreError::Duplicate(key));
        }
        map.insert(
            key,
            Versioned {
                record: challenge.clone(),
                version: 1,
            },
        );
        Ok(1)
    }

    fn get(&self, id: &ChallengeId) -> Result<Versioned<Challenge>, StoreError> {
        self.challenges
            .lock()
            .unwrap()
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn compare_and_put(
        &self,
        id: &ChallengeId,
        expected_version: u64,
        challenge: &Challenge,
    ) -> Result<u64, StoreError> {
        let mut map = self.challenges.lock().unwrap();
        let entry = map
            .get_mut(id.as_str())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if entry.version != expected_version {
            return Err(StoreError::VersionConflict {
                key: id.to_string(),
                expected: expected_version,
                found: entry.version,
            });
        }
        entry.record = challenge.clone();
        entry.version += 1;
        Ok(entry.version)
    }

    fn list(&self) -> Result<Vec<Versioned<Challenge>>, StoreError> {
        Ok(self.challenges.lock().unwrap().values().cloned().collect())
    }

    fn deadline_candidates(&self, now: Timestamp) -> Result<Vec<Versioned<Challenge>>, StoreError> {
        Ok(self
            .challenges
            .lock()
            .unwrap()
            .values()
            .filter(|v| {
                v.record
                    .next_deadline()
                    .is_some_and(|deadline| deadline.is_past(now))
            })
            .cloned()
            .collect())
    }

    fn settlement_candidates(&self) -> Result<Vec<Versioned<Challenge>>, StoreError> {
        Ok(self
            .challenges
            .lock()
            .unwrap()
            .values()
            .filter(|v| v.record.settlement_due())
            .cloned()
            .collect())
    }

    fn challenge_count(&self) -> Result<u64, StoreError> {
        Ok(self.challenges.lock().unwrap().len() as u64)
    }
}
