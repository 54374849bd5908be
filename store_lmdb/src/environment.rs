//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::{LmdbAnnouncementStore, LmdbError, LmdbIndexStore};

/// The schema version that the current code writes and expects.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Number of named databases opened by [`LmdbEnvironment::open`].
pub const DATABASE_COUNT: u32 = 5;

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    pub(crate) announcements_db: Database<Bytes, Bytes>,
    pub(crate) records_db: Database<Bytes, Bytes>,
    pub(crate) entry_owners_db: Database<Bytes, Bytes>,
    pub(crate) undo_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// A fresh environment is stamped with [`CURRENT_SCHEMA_VERSION`]; an
    /// existing one written with a different version is refused.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path).map_err(|e| LmdbError::Heed(e.to_string()))?;

        // SAFETY: the environment is opened once per path for the lifetime of the process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(DATABASE_COUNT)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let announcements_db = env.create_database(&mut wtxn, Some("announcements"))?;
        let records_db = env.create_database(&mut wtxn, Some("bounty_records"))?;
        let entry_owners_db = env.create_database(&mut wtxn, Some("entry_owners"))?;
        let undo_db = env.create_database(&mut wtxn, Some("block_undo"))?;
        let meta_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("meta"))?;

        let stored = match meta_db.get(&wtxn, SCHEMA_VERSION_KEY)? {
            Some(bytes) => Some(decode_version(bytes)?),
            None => None,
        };
        match stored {
            None => {
                meta_db.put(
                    &mut wtxn,
                    SCHEMA_VERSION_KEY,
                    &CURRENT_SCHEMA_VERSION.to_le_bytes(),
                )?;
                tracing::info!(
                    path = %path.display(),
                    version = CURRENT_SCHEMA_VERSION,
                    "created deadpool database"
                );
            }
            Some(v) if v == CURRENT_SCHEMA_VERSION => {
                tracing::info!(path = %path.display(), version = v, "opened deadpool database");
            }
            Some(found) => {
                return Err(LmdbError::SchemaVersion {
                    found,
                    expected: CURRENT_SCHEMA_VERSION,
                });
            }
        }
        wtxn.commit()?;

        Ok(Self {
            env: Arc::new(env),
            announcements_db,
            records_db,
            entry_owners_db,
            undo_db,
            meta_db,
        })
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn announcement_store(&self) -> LmdbAnnouncementStore {
        LmdbAnnouncementStore {
            env: Arc::clone(&self.env),
            announcements_db: self.announcements_db,
        }
    }

    pub fn index_store(&self) -> LmdbIndexStore {
        LmdbIndexStore {
            env: Arc::clone(&self.env),
            records_db: self.records_db,
            entry_owners_db: self.entry_owners_db,
            undo_db: self.undo_db,
            meta_db: self.meta_db,
        }
    }

    /// Schema version stamped in the meta database.
    pub fn schema_version(&self) -> Result<u32, LmdbError> {
        let rtxn = self.env.read_txn()?;
        let bytes = self
            .meta_db
            .get(&rtxn, SCHEMA_VERSION_KEY)?
            .ok_or_else(|| LmdbError::NotFound("meta key 'schema_version'".into()))?;
        decode_version(bytes)
    }
}

fn decode_version(bytes: &[u8]) -> Result<u32, LmdbError> {
    let arr: [u8; 4] = bytes.try_into().map_err(|_| {
        LmdbError::Serialization(format!("schema version has {} bytes, expected 4", bytes.len()))
    })?;
    Ok(u32::from_le_bytes(arr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_environment_is_stamped() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).expect("open");
        assert_eq!(env.schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn newer_schema_is_refused() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        {
            let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).expect("open");
            let mut wtxn = env.env().write_txn().unwrap();
            env.meta_db
                .put(&mut wtxn, SCHEMA_VERSION_KEY, &99u32.to_le_bytes())
                .unwrap();
            wtxn.commit().unwrap();
        }
        let result = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024);
        assert!(matches!(
            result,
            Err(LmdbError::SchemaVersion { found: 99, .. })
        ));
    }
}
