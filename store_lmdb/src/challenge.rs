//! LMDB implementation of ChallengeStore.
//!
//! Key: the challenge id bytes. Value: the bincode-encoded
//! `Versioned<Challenge>`. The version check in `compare_and_put` happens
//! inside the same write transaction as the update, so LMDB's writer lock
//! makes the read-check-write linearizable.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RwTxn};

use arena_store::{ChallengeStore, StoreError, Versioned};
use arena_types::{Challenge, ChallengeId, Timestamp};

use crate::LmdbError;

pub struct LmdbChallengeStore {
    pub(crate) env: Arc<Env>,
    pub(crate) db: Database<Bytes, Bytes>,
}

impl LmdbChallengeStore {
    fn read_in_txn(
        &self,
        wtxn: &RwTxn<'_>,
        id: &ChallengeId,
    ) -> Result<Option<Versioned<Challenge>>, LmdbError> {
        match self.db.get(wtxn, id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    fn write_in_txn(
        &self,
        wtxn: &mut RwTxn<'_>,
        entry: &Versioned<Challenge>,
    ) -> Result<(), LmdbError> {
        let bytes = bincode::serialize(entry)?;
        self.db
            .put(wtxn, entry.record.id.as_str().as_bytes(), &bytes)?;
        Ok(())
    }

    fn scan<F>(&self, mut keep: F) -> Result<Vec<Versioned<Challenge>>, StoreError>
    where
        F: FnMut(&Challenge) -> bool,
    {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let iter = self.db.iter(&rtxn).map_err(LmdbError::from)?;
        let mut results = Vec::new();
        for item in iter {
            let (_key, bytes) = item.map_err(LmdbError::from)?;
            let entry: Versioned<Challenge> =
                bincode::deserialize(bytes).map_err(LmdbError::from)?;
            if keep(&entry.record) {
                results.push(entry);
            }
        }
        Ok(results)
    }
}

impl ChallengeStore for LmdbChallengeStore {
    fn insert(&self, challenge: &Challenge) -> Result<u64, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .read_in_txn(&wtxn, &challenge.id)
            .map_err(StoreError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(challenge.id.to_string()));
        }
        let entry = Versioned {
            record: challenge.clone(),
            version: 1,
        };
        self.write_in_txn(&mut wtxn, &entry)
            .map_err(StoreError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(1)
    }

    fn get(&self, id: &ChallengeId) -> Result<Versioned<Challenge>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let bytes = self
            .db
            .get(&rtxn, id.as_str().as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let entry: Versioned<Challenge> = bincode::deserialize(bytes).map_err(LmdbError::from)?;
        Ok(entry)
    }

    fn compare_and_put(
        &self,
        id: &ChallengeId,
        expected_version: u64,
        challenge: &Challenge,
    ) -> Result<u64, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let current = self
            .read_in_txn(&wtxn, id)
            .map_err(StoreError::from)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                key: id.to_string(),
                expected: expected_version,
                found: current.version,
            });
        }
        let entry = Versioned {
            record: challenge.clone(),
            version: expected_version + 1,
        };
        self.write_in_txn(&mut wtxn, &entry)
            .map_err(StoreError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(entry.version)
    }

    fn list(&self) -> Result<Vec<Versioned<Challenge>>, StoreError> {
        self.scan(|_| true)
    }

    fn deadline_candidates(&self, now: Timestamp) -> Result<Vec<Versioned<Challenge>>, StoreError> {
        self.scan(|c| c.next_deadline().is_some_and(|deadline| deadline.is_past(now)))
    }

    fn settlement_candidates(&self) -> Result<Vec<Versioned<Challenge>>, StoreError> {
        self.scan(|c| c.settlement_due())
    }

    fn challenge_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use arena_types::{ChallengeStatus, CoordinatorParams, PlayerAddress, StakeAmount};

    fn open_store(dir: &tempfile::TempDir) -> LmdbChallengeStore {
        LmdbEnvironment::open(dir.path(), 4, 16 * 1024 * 1024)
            .unwrap()
            .challenge_store()
    }

    fn challenge(id: &str) -> Challenge {
        Challenge::open(
            ChallengeId::new(id),
            PlayerAddress::new("alice"),
            StakeAmount::new(1_000),
            2,
            Timestamp::new(100),
            &CoordinatorParams::fast_defaults(),
        )
    }

    #[test]
    fn insert_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let c = challenge("c1");

        assert_eq!(store.insert(&c).unwrap(), 1);
        let got = store.get(&c.id).unwrap();
        assert_eq!(got.version, 1);
        assert_eq!(got.record, c);
    }

    #[test]
    fn duplicate_insert_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let c = challenge("c1");
        store.insert(&c).unwrap();
        assert!(matches!(
            store.insert(&c).unwrap_err(),
            StoreError::Duplicate(_)
        ));
    }

    #[test]
    fn missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        assert!(matches!(
            store.get(&ChallengeId::new("nope")).unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[test]
    fn conditional_write_bumps_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let mut c = challenge("c1");
        store.insert(&c).unwrap();

        c.status = ChallengeStatus::Cancelled;
        assert_eq!(store.compare_and_put(&c.id, 1, &c).unwrap(), 2);
        let got = store.get(&c.id).unwrap();
        assert_eq!(got.version, 2);
        assert_eq!(got.record.status, ChallengeStatus::Cancelled);
    }

    #[test]
    fn stale_conditional_write_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let mut c = challenge("c1");
        store.insert(&c).unwrap();
        store.compare_and_put(&c.id, 1, &c).unwrap();

        c.status = ChallengeStatus::Cancelled;
        let err = store.compare_and_put(&c.id, 1, &c).unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict {
                expected: 1,
                found: 2,
                ..
            }
        ));
        // The stale write left no trace.
        assert_eq!(
            store.get(&c.id).unwrap().record.status,
            ChallengeStatus::PendingWaitingForOpponent
        );
    }

    #[test]
    fn deadline_candidates_filter_on_next_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        store.insert(&challenge("early")).unwrap();
        let mut late = challenge("late");
        late.expires_at = Some(Timestamp::new(10_000));
        store.insert(&late).unwrap();

        // fast_defaults arms expiry at created_at + 100.
        let due = store.deadline_candidates(Timestamp::new(250)).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].record.id, ChallengeId::new("early"));
    }

    #[test]
    fn settlement_candidates_respect_trigger_flag() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let mut owed = challenge("owed");
        owed.needs_payout = true;
        store.insert(&owed).unwrap();
        let mut done = challenge("done");
        done.needs_payout = true;
        done.payout_triggered = true;
        store.insert(&done).unwrap();

        let due = store.settlement_candidates().unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].record.id, ChallengeId::new("owed"));
    }

    #[test]
    fn count_tracks_inserts() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        assert_eq!(store.challenge_count().unwrap(), 0);
        store.insert(&challenge("a")).unwrap();
        store.insert(&challenge("b")).unwrap();
        assert_eq!(store.challenge_count().unwrap(), 2);
    }
}
