//! LMDB environment setup.

use crate::challenge::LmdbChallengeStore;
use crate::LmdbError;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use std::path::Path;
use std::sync::Arc;

const CHALLENGES_DB: &str = "challenges";

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    challenges_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)
            .map_err(|e| LmdbError::Heed(format!("create {}: {e}", path.display())))?;
        // Safety: the environment directory is owned by this process and is
        // not opened twice.
        let env = unsafe {
            EnvOpenOptions::new()
                .max_dbs(max_dbs)
                .map_size(map_size)
                .open(path)?
        };
        let mut wtxn = env.write_txn()?;
        let challenges_db = env.create_database(&mut wtxn, Some(CHALLENGES_DB))?;
        wtxn.commit()?;
        tracing::info!(path = %path.display(), "opened LMDB environment");
        Ok(Self {
            env: Arc::new(env),
            challenges_db,
        })
    }

    pub fn challenge_store(&self) -> LmdbChallengeStore {
        LmdbChallengeStore {
            env: self.env.clone(),
            db: self.challenges_db,
        }
    }
}
