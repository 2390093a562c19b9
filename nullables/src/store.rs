//! Nullable store: thread-safe in-memory key-value storage for testing.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use powersnap_store::{KvOp, KvStore, StoreError, WriteBatch};

#[derive(Clone, Default)]
struct State {
    strings: HashMap<String, Vec<u8>>,
    hashes: HashMap<String, BTreeMap<String, Vec<u8>>>,
    zsets: HashMap<String, BTreeSet<(i64, Vec<u8>)>>,
}

/// An in-memory [`KvStore`].
///
/// Batches are applied to a copy of the state and swapped in only when every
/// operation succeeded, which gives the same all-or-nothing behaviour as a
/// real transaction. Failures can be injected to exercise error paths.
/// Thread-safe for use with tokio's multi-threaded runtime.
pub struct NullKvStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
    /// One-shot: fail the next commit just before applying this op index.
    fail_at_op: Mutex<Option<usize>>,
}

impl NullKvStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            unavailable: AtomicBool::new(false),
            fail_at_op: Mutex::new(None),
        }
    }

    /// Make every subsequent call fail as if the backend were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail the next commit after `op_index` of its operations have been applied.
    pub fn fail_commit_at_op(&self, op_index: usize) {
        *self.fail_at_op.lock().unwrap() = Some(op_index);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Backend("null store is unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for NullKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for NullKvStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_available()?;
        Ok(self.state.lock().unwrap().strings.get(key).cloned())
    }

    fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_available()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .hashes
            .get(key)
            .and_then(|h| h.get(field))
            .cloned())
    }

    fn hgetall(&self, key: &str) -> Result<BTreeMap<String, Vec<u8>>, StoreError> {
        self.check_available()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .hashes
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    fn zrevrange_by_score(
        &self,
        key: &str,
        max: i64,
        limit: usize,
    ) -> Result<Vec<(i64, Vec<u8>)>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().unwrap();
        let Some(set) = state.zsets.get(key) else {
            return Ok(Vec::new());
        };
        Ok(set
            .iter()
            .rev()
            .filter(|(score, _)| *score <= max)
            .take(limit)
            .cloned()
            .collect())
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.check_available()?;
        let fail_at = self.fail_at_op.lock().unwrap().take();
        let mut state = self.state.lock().unwrap();
        let mut staged = state.clone();
        for (index, op) in batch.into_ops().into_iter().enumerate() {
            if fail_at == Some(index) {
                return Err(StoreError::Backend(format!("injected failure at op {index}")));
            }
            match op {
                KvOp::Set { key, value } => {
                    staged.strings.insert(key, value);
                }
                KvOp::HSet { key, field, value } => {
                    staged.hashes.entry(key).or_default().insert(field, value);
                }
                KvOp::ZAdd { key, score, member } => {
                    staged.zsets.entry(key).or_default().insert((score, member));
                }
            }
        }
        *state = staged;
        Ok(())
    }
}
