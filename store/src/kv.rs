//! Key-value primitives the cache store and delegation ledger are built on.
//!
//! Three structures live under string keys: plain values, hashes (field →
//! value) and ordered sets (members scored by a signed integer). Reads are
//! individual calls; writes are grouped in a [`WriteBatch`] and committed
//! atomically, so a batch is either fully visible or not at all.

use std::collections::BTreeMap;

use crate::StoreError;

/// One buffered write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KvOp {
    Set {
        key: String,
        value: Vec<u8>,
    },
    HSet {
        key: String,
        field: String,
        value: Vec<u8>,
    },
    /// Add `member` to the ordered set at `score`. Re-adding an identical
    /// (score, member) pair is a no-op.
    ZAdd {
        key: String,
        score: i64,
        member: Vec<u8>,
    },
}

/// A group of writes committed in a single backend transaction.
///
/// Dropping a batch without passing it to [`KvStore::commit`] discards it.
#[derive(Clone, Debug, Default)]
pub struct WriteBatch {
    ops: Vec<KvOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(KvOp::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn hset(
        &mut self,
        key: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.ops.push(KvOp::HSet {
            key: key.into(),
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn zadd(&mut self, key: impl Into<String>, score: i64, member: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(KvOp::ZAdd {
            key: key.into(),
            score,
            member: member.into(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[KvOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<KvOp> {
        self.ops
    }
}

/// Backend-neutral key-value store.
pub trait KvStore: Send + Sync {
    /// Read a plain value.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Read one hash field.
    fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Read every field of a hash. Missing hashes are empty.
    fn hgetall(&self, key: &str) -> Result<BTreeMap<String, Vec<u8>>, StoreError>;

    /// Members of an ordered set with score ≤ `max`, highest score first,
    /// at most `limit` of them.
    fn zrevrange_by_score(
        &self,
        key: &str,
        max: i64,
        limit: usize,
    ) -> Result<Vec<(i64, Vec<u8>)>, StoreError>;

    /// Apply every operation in `batch` atomically.
    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    fn hexists(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        Ok(self.hget(key, field)?.is_some())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.set(key, value);
        self.commit(batch)
    }

    fn hset(&self, key: &str, field: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.hset(key, field, value);
        self.commit(batch)
    }
}
