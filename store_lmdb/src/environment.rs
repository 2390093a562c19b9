//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use powersnap_store::{QueuePolicy, StoreError};
use powersnap_types::{Clock, NetworkId};

use crate::{LmdbError, LmdbKvStore, LmdbTaskQueue};

const MAX_DBS: u32 = 8;

/// The schema version that the current code writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Env,
    /// Plain values: key → value.
    pub(crate) strings_db: Database<Bytes, Bytes>,
    /// Hash fields: `key \0 field` → value.
    pub(crate) hashes_db: Database<Bytes, Bytes>,
    /// Ordered-set members: `key \0 score_be(8) member` → empty.
    pub(crate) zsets_db: Database<Bytes, Bytes>,
    /// Pending queue messages: `network_be(8) id_be(8)` → envelope.
    pub(crate) queue_db: Database<Bytes, Bytes>,
    /// Exhausted queue messages, same key shape as `queue_db`.
    pub(crate) dead_letters_db: Database<Bytes, Bytes>,
    /// Consumer definitions: consumer name → config.
    pub(crate) consumers_db: Database<Bytes, Bytes>,
    /// Bookkeeping: schema version, message sequence.
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given directory.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;
        // SAFETY: the environment is opened once per process per path; the
        // directory is not shared with other LMDB users.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let strings_db = env.create_database(&mut wtxn, Some("strings"))?;
        let hashes_db = env.create_database(&mut wtxn, Some("hashes"))?;
        let zsets_db = env.create_database(&mut wtxn, Some("zsets"))?;
        let queue_db = env.create_database(&mut wtxn, Some("queue"))?;
        let dead_letters_db = env.create_database(&mut wtxn, Some("dead_letters"))?;
        let consumers_db = env.create_database(&mut wtxn, Some("consumers"))?;
        let meta_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("meta"))?;

        let stored = match meta_db.get(&wtxn, SCHEMA_VERSION_KEY)? {
            Some(bytes) if bytes.len() == 4 => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(bytes);
                u32::from_be_bytes(buf)
            }
            Some(_) => {
                return Err(LmdbError::Serialization(
                    "schema_version has unexpected byte length".to_string(),
                ))
            }
            None => 0,
        };
        if stored > CURRENT_SCHEMA_VERSION {
            return Err(LmdbError::SchemaTooNew {
                found: stored,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }
        if stored < CURRENT_SCHEMA_VERSION {
            meta_db.put(
                &mut wtxn,
                SCHEMA_VERSION_KEY,
                &CURRENT_SCHEMA_VERSION.to_be_bytes(),
            )?;
        }
        wtxn.commit()?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env,
            strings_db,
            hashes_db,
            zsets_db,
            queue_db,
            dead_letters_db,
            consumers_db,
            meta_db,
        })
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Key-value view over this environment.
    pub fn kv_store(&self) -> LmdbKvStore {
        LmdbKvStore {
            env: self.env.clone(),
            strings_db: self.strings_db,
            hashes_db: self.hashes_db,
            zsets_db: self.zsets_db,
        }
    }

    /// Task queue with one consumer per network, created or updated to `policy`.
    pub fn task_queue(
        &self,
        networks: &[NetworkId],
        policy: QueuePolicy,
        clock: Arc<dyn Clock>,
    ) -> Result<LmdbTaskQueue, StoreError> {
        LmdbTaskQueue::open(self, networks, policy, clock)
    }
}
