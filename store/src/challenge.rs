//! Challenge storage trait.

use crate::StoreError;
use arena_types::{Challenge, ChallengeId, Timestamp};
use serde::{Deserialize, Serialize};

/// A stored record together with its write version.
///
/// Versions start at 1 on insert and increment by 1 on every successful
/// write. Conditional writes compare against the version a caller read.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub record: T,
    pub version: u64,
}

/// Trait for challenge persistence under optimistic concurrency.
///
/// There are no partial updates: callers read a full [`Versioned<Challenge>`],
/// apply a transition, and write the whole record back conditionally on the
/// version they read. A lost race surfaces as
/// [`StoreError::VersionConflict`].
pub trait ChallengeStore: Send + Sync {
    /// Insert a new challenge. Fails with [`StoreError::Duplicate`] if the id
    /// already exists. Returns the initial version.
    fn insert(&self, challenge: &Challenge) -> Result<u64, StoreError>;

    /// Fetch a challenge with its current version.
    fn get(&self, id: &ChallengeId) -> Result<Versioned<Challenge>, StoreError>;

    /// Write a challenge back conditionally on `expected_version` matching
    /// the stored version. Returns the new version on success.
    fn compare_and_put(
        &self,
        id: &ChallengeId,
        expected_version: u64,
        challenge: &Challenge,
    ) -> Result<u64, StoreError>;

    /// All stored challenges. Intended for listings and sweeps, not hot
    /// paths.
    fn list(&self) -> Result<Vec<Versioned<Challenge>>, StoreError>;

    /// Challenges whose next armed deadline is at or before `now`.
    fn deadline_candidates(&self, now: Timestamp) -> Result<Vec<Versioned<Challenge>>, StoreError>;

    /// Challenges owing a payout that has not yet been triggered.
    fn settlement_candidates(&self) -> Result<Vec<Versioned<Challenge>>, StoreError>;

    /// Total number of stored challenges.
    fn challenge_count(&self) -> Result<u64, StoreError>;
}
