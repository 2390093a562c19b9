//! LMDB implementation of [`KvStore`].
//!
//! Three databases back the three structures:
//! - `strings`: `key` → value.
//! - `hashes`: `key \0 field` → value. A hash is the prefix range `key \0`.
//! - `zsets`: `key \0 score(8) member` → empty. The score is stored big-endian
//!   with the sign bit flipped so that byte order equals numeric order, which
//!   turns "highest score ≤ max" into a reverse range scan.

use std::collections::BTreeMap;
use std::ops::Bound;

use heed::types::Bytes;
use heed::{Database, Env};

use powersnap_store::{KvOp, KvStore, StoreError, WriteBatch};

use crate::LmdbError;

const SEPARATOR: u8 = 0;

pub struct LmdbKvStore {
    pub(crate) env: Env,
    pub(crate) strings_db: Database<Bytes, Bytes>,
    pub(crate) hashes_db: Database<Bytes, Bytes>,
    pub(crate) zsets_db: Database<Bytes, Bytes>,
}

fn prefix(key: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(key.len() + 1);
    out.extend_from_slice(key.as_bytes());
    out.push(SEPARATOR);
    out
}

fn hash_field_key(key: &str, field: &str) -> Vec<u8> {
    let mut out = prefix(key);
    out.extend_from_slice(field.as_bytes());
    out
}

fn encode_score(score: i64) -> [u8; 8] {
    ((score as u64) ^ (1 << 63)).to_be_bytes()
}

fn decode_score(bytes: &[u8]) -> i64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    (u64::from_be_bytes(buf) ^ (1 << 63)) as i64
}

fn zset_member_key(key: &str, score: i64, member: &[u8]) -> Vec<u8> {
    let mut out = prefix(key);
    out.extend_from_slice(&encode_score(score));
    out.extend_from_slice(member);
    out
}

impl KvStore for LmdbKvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let value = self
            .strings_db
            .get(&rtxn, key.as_bytes())
            .map_err(LmdbError::from)?;
        Ok(value.map(<[u8]>::to_vec))
    }

    fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let value = self
            .hashes_db
            .get(&rtxn, &hash_field_key(key, field))
            .map_err(LmdbError::from)?;
        Ok(value.map(<[u8]>::to_vec))
    }

    fn hgetall(&self, key: &str) -> Result<BTreeMap<String, Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let prefix = prefix(key);
        let iter = self
            .hashes_db
            .prefix_iter(&rtxn, &prefix)
            .map_err(LmdbError::from)?;
        let mut fields = BTreeMap::new();
        for entry in iter {
            let (k, v) = entry.map_err(LmdbError::from)?;
            let field = std::str::from_utf8(&k[prefix.len()..])
                .map_err(|e| StoreError::corruption(key, e))?;
            fields.insert(field.to_string(), v.to_vec());
        }
        Ok(fields)
    }

    fn zrevrange_by_score(
        &self,
        key: &str,
        max: i64,
        limit: usize,
    ) -> Result<Vec<(i64, Vec<u8>)>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let lower = prefix(key);
        let upper = match max.checked_add(1) {
            Some(next) => {
                let mut upper = lower.clone();
                upper.extend_from_slice(&encode_score(next));
                upper
            }
            None => {
                let mut upper = key.as_bytes().to_vec();
                upper.push(SEPARATOR + 1);
                upper
            }
        };
        let bounds = (
            Bound::Included(lower.as_slice()),
            Bound::Excluded(upper.as_slice()),
        );
        let iter = self
            .zsets_db
            .rev_range(&rtxn, &bounds)
            .map_err(LmdbError::from)?;

        let mut members = Vec::new();
        for entry in iter.take(limit) {
            let (k, _) = entry.map_err(LmdbError::from)?;
            let rest = &k[lower.len()..];
            if rest.len() < 8 {
                return Err(StoreError::corruption(key, "ordered-set entry without score"));
            }
            members.push((decode_score(rest), rest[8..].to_vec()));
        }
        Ok(members)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        // Any early return drops `wtxn`, which aborts the transaction.
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for op in batch.into_ops() {
            match op {
                KvOp::Set { key, value } => self
                    .strings_db
                    .put(&mut wtxn, key.as_bytes(), &value)
                    .map_err(LmdbError::from)?,
                KvOp::HSet { key, field, value } => self
                    .hashes_db
                    .put(&mut wtxn, &hash_field_key(&key, &field), &value)
                    .map_err(LmdbError::from)?,
                KvOp::ZAdd { key, score, member } => self
                    .zsets_db
                    .put(&mut wtxn, &zset_member_key(&key, score, &member), &[])
                    .map_err(LmdbError::from)?,
            }
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    fn temp_store() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).expect("failed to open env");
        (dir, env)
    }

    #[test]
    fn score_encoding_preserves_order() {
        let scores = [i64::MIN, -5, -1, 0, 1, 42, i64::MAX];
        for pair in scores.windows(2) {
            assert!(encode_score(pair[0]) < encode_score(pair[1]));
            assert_eq!(decode_score(&encode_score(pair[0])), pair[0]);
        }
    }

    #[test]
    fn hash_fields_are_isolated_per_key() {
        let (_dir, env) = temp_store();
        let kv = env.kv_store();
        kv.hset("h:1", "a", b"1").unwrap();
        kv.hset("h:1", "b", b"2").unwrap();
        kv.hset("h:10", "a", b"other").unwrap();

        let all = kv.hgetall("h:1").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["a"], b"1");
        assert_eq!(all["b"], b"2");
        assert_eq!(kv.hget("h:10", "a").unwrap().as_deref(), Some(&b"other"[..]));
        assert!(kv.hexists("h:1", "b").unwrap());
        assert!(!kv.hexists("h:1", "c").unwrap());
        assert!(kv.hgetall("missing").unwrap().is_empty());
    }

    #[test]
    fn hset_overwrites_single_field() {
        let (_dir, env) = temp_store();
        let kv = env.kv_store();
        kv.hset("h", "a", b"old").unwrap();
        kv.hset("h", "b", b"keep").unwrap();
        kv.hset("h", "a", b"new").unwrap();
        let all = kv.hgetall("h").unwrap();
        assert_eq!(all["a"], b"new");
        assert_eq!(all["b"], b"keep");
    }

    #[test]
    fn zrevrange_returns_nearest_at_or_below() {
        let (_dir, env) = temp_store();
        let kv = env.kv_store();
        let mut batch = WriteBatch::new();
        batch
            .zadd("z", 300, b"c".to_vec())
            .zadd("z", 100, b"a".to_vec())
            .zadd("z", 200, b"b".to_vec())
            .zadd("z2", 150, b"x".to_vec());
        kv.commit(batch).unwrap();

        assert_eq!(kv.zrevrange_by_score("z", 250, 1).unwrap(), vec![(200, b"b".to_vec())]);
        assert_eq!(kv.zrevrange_by_score("z", 200, 1).unwrap(), vec![(200, b"b".to_vec())]);
        assert!(kv.zrevrange_by_score("z", 99, 1).unwrap().is_empty());
        assert_eq!(
            kv.zrevrange_by_score("z", i64::MAX, 5).unwrap(),
            vec![(300, b"c".to_vec()), (200, b"b".to_vec()), (100, b"a".to_vec())]
        );
    }

    #[test]
    fn zadd_same_pair_is_idempotent() {
        let (_dir, env) = temp_store();
        let kv = env.kv_store();
        for _ in 0..3 {
            let mut batch = WriteBatch::new();
            batch.zadd("z", 7, b"m".to_vec());
            kv.commit(batch).unwrap();
        }
        assert_eq!(kv.zrevrange_by_score("z", 100, 10).unwrap().len(), 1);
    }

    #[test]
    fn negative_scores_are_ordered() {
        let (_dir, env) = temp_store();
        let kv = env.kv_store();
        let mut batch = WriteBatch::new();
        batch.zadd("z", -10, b"neg".to_vec()).zadd("z", 0, b"zero".to_vec());
        kv.commit(batch).unwrap();
        assert_eq!(kv.zrevrange_by_score("z", -1, 1).unwrap(), vec![(-10, b"neg".to_vec())]);
    }

    #[test]
    fn failed_batch_leaves_nothing_behind() {
        let (_dir, env) = temp_store();
        let kv = env.kv_store();
        // LMDB rejects keys longer than 511 bytes, failing the batch part-way.
        let oversized = "k".repeat(600);
        let mut batch = WriteBatch::new();
        batch
            .set("checkpoint", b"500".to_vec())
            .zadd("z", 1, b"event".to_vec())
            .zadd(oversized, 2, b"event".to_vec());
        assert!(kv.commit(batch).is_err());

        assert_eq!(kv.get("checkpoint").unwrap(), None);
        assert!(kv.zrevrange_by_score("z", 10, 1).unwrap().is_empty());
    }
}
