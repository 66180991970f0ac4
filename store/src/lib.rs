//! Abstract storage traits for the ARENA coordinator.
//!
//! Every storage backend (LMDB in production, in-memory for testing)
//! implements these traits. The rest of the codebase depends only on the
//! traits.

pub mod challenge;
pub mod error;

pub use challenge::{ChallengeStore, Versioned};
pub use error::StoreError;
