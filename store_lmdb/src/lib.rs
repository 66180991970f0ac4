//! LMDB storage backend for the ARENA coordinator.
//!
//! Implements the storage traits from `arena-store` using the `heed` LMDB
//! bindings. The whole challenge record is one bincode value per key;
//! conditional writes check the stored version and apply the update inside
//! a single write transaction, which LMDB serializes.

pub mod challenge;
pub mod environment;
pub mod error;

pub use challenge::LmdbChallengeStore;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
