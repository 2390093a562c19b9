//! Height-ordered delegation event log with an atomically co-updated checkpoint.
//!
//! Each (network, address) owns two ordered sets, one for create events and
//! one for delete events, scored by block height. Members are the JSON form
//! of the event, so recording the same event twice stores it once.
//!
//! Resolution is a nearest-preceding-version lookup: for each set, the entry
//! with the greatest height ≤ the query height. Writers may arrive out of
//! height order; the answer only depends on the set contents.

use std::sync::Arc;

use powersnap_store::{keys, KvStore, StoreError, WriteBatch};
use powersnap_types::{Address, BlockHeight, DelegateEvent, DelegationState, NetworkId};

pub struct DelegationLedger {
    kv: Arc<dyn KvStore>,
}

impl DelegationLedger {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Append events and move the checkpoint to `checkpoint`, all or nothing.
    pub fn record_events(
        &self,
        network: NetworkId,
        creates: &[DelegateEvent],
        deletes: &[DelegateEvent],
        checkpoint: BlockHeight,
    ) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        for event in creates {
            batch.zadd(
                keys::create_events(network, &event.voter_address),
                event.block_height,
                encode_event(event)?,
            );
        }
        for event in deletes {
            batch.zadd(
                keys::delete_events(network, &event.voter_address),
                event.block_height,
                encode_event(event)?,
            );
        }
        batch.set(keys::checkpoint(network), checkpoint.to_string());

        self.kv.commit(batch)?;
        tracing::debug!(
            %network,
            creates = creates.len(),
            deletes = deletes.len(),
            checkpoint,
            "recorded delegation events"
        );
        Ok(())
    }

    /// Latest create and delete events of `address` at or below `max_height`.
    pub fn resolve(
        &self,
        network: NetworkId,
        address: &Address,
        max_height: BlockHeight,
    ) -> Result<DelegationState, StoreError> {
        let create = self.latest(&keys::create_events(network, address), max_height)?;
        let delete = self.latest(&keys::delete_events(network, address), max_height)?;
        Ok(DelegationState { create, delete })
    }

    /// Height through which events of `network` have been ingested; 0 when unset.
    pub fn checkpoint(&self, network: NetworkId) -> Result<BlockHeight, StoreError> {
        read_checkpoint(self.kv.as_ref(), network)
    }

    fn latest(&self, key: &str, max_height: BlockHeight) -> Result<Option<DelegateEvent>, StoreError> {
        let Some((_, member)) = self.kv.zrevrange_by_score(key, max_height, 1)?.into_iter().next() else {
            return Ok(None);
        };
        serde_json::from_slice(&member)
            .map(Some)
            .map_err(|e| StoreError::corruption(key, e))
    }
}

fn encode_event(event: &DelegateEvent) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(event).map_err(|e| StoreError::Serialization(e.to_string()))
}

pub(crate) fn read_checkpoint(kv: &dyn KvStore, network: NetworkId) -> Result<BlockHeight, StoreError> {
    let key = keys::checkpoint(network);
    let Some(raw) = kv.get(&key)? else {
        return Ok(0);
    };
    std::str::from_utf8(&raw)
        .ok()
        .and_then(|s| s.trim().parse::<BlockHeight>().ok())
        .ok_or_else(|| StoreError::corruption(key, "checkpoint is not an integer"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use powersnap_nullables::NullKvStore;

    const NET: NetworkId = NetworkId::new(1);

    fn event(address: &str, handle: &str, height: BlockHeight) -> DelegateEvent {
        DelegateEvent {
            network: NET,
            voter_address: Address::new(address),
            handle: handle.to_string(),
            block_height: height,
        }
    }

    fn ledger() -> (Arc<NullKvStore>, DelegationLedger) {
        let kv = Arc::new(NullKvStore::new());
        (kv.clone(), DelegationLedger::new(kv))
    }

    #[test]
    fn as_of_resolution_follows_heights() {
        let (_kv, ledger) = ledger();
        let addr = Address::new("f1voter");
        ledger
            .record_events(NET, &[event("f1voter", "dev1", 100)], &[event("f1voter", "dev1", 200)], 300)
            .unwrap();

        let at_150 = ledger.resolve(NET, &addr, 150).unwrap();
        assert_eq!(at_150.create.as_ref().map(|e| e.block_height), Some(100));
        assert!(at_150.delete.is_none());
        assert!(at_150.is_active());

        let at_250 = ledger.resolve(NET, &addr, 250).unwrap();
        assert_eq!(at_250.delete.as_ref().map(|e| e.block_height), Some(200));
        assert!(!at_250.is_active());

        let at_50 = ledger.resolve(NET, &addr, 50).unwrap();
        assert!(at_50.create.is_none());
        assert!(!at_50.is_active());
    }

    #[test]
    fn create_and_delete_at_same_height_is_active() {
        let (_kv, ledger) = ledger();
        ledger
            .record_events(NET, &[event("f1voter", "dev1", 100)], &[event("f1voter", "dev1", 100)], 100)
            .unwrap();
        let state = ledger.resolve(NET, &Address::new("f1voter"), 100).unwrap();
        assert!(state.is_active());
    }

    #[test]
    fn redelegation_after_delete_is_active_again() {
        let (_kv, ledger) = ledger();
        ledger
            .record_events(
                NET,
                &[event("f1voter", "dev1", 100), event("f1voter", "dev2", 300)],
                &[event("f1voter", "dev1", 200)],
                300,
            )
            .unwrap();
        let state = ledger.resolve(NET, &Address::new("f1voter"), 400).unwrap();
        assert_eq!(state.active_handle(), Some("dev2"));
    }

    #[test]
    fn out_of_order_writers_resolve_by_height() {
        let (_kv, ledger) = ledger();
        ledger.record_events(NET, &[event("f1voter", "late", 500)], &[], 500).unwrap();
        ledger.record_events(NET, &[event("f1voter", "early", 100)], &[], 500).unwrap();

        let addr = Address::new("f1voter");
        assert_eq!(ledger.resolve(NET, &addr, 499).unwrap().active_handle(), Some("early"));
        assert_eq!(ledger.resolve(NET, &addr, 500).unwrap().active_handle(), Some("late"));
    }

    #[test]
    fn identical_event_is_stored_once() {
        let (kv, ledger) = ledger();
        let e = event("f1voter", "dev1", 100);
        ledger.record_events(NET, &[e.clone()], &[], 100).unwrap();
        ledger.record_events(NET, &[e.clone()], &[], 100).unwrap();
        let members = kv
            .zrevrange_by_score(&keys::create_events(NET, &e.voter_address), i64::MAX, 10)
            .unwrap();
        assert_eq!(members.len(), 1);
    }

    #[test]
    fn addresses_and_networks_are_separate_series() {
        let (_kv, ledger) = ledger();
        ledger.record_events(NET, &[event("f1a", "dev1", 10)], &[], 10).unwrap();

        assert!(ledger.resolve(NET, &Address::new("f1b"), 100).unwrap().create.is_none());
        assert!(ledger
            .resolve(NetworkId::new(2), &Address::new("f1a"), 100)
            .unwrap()
            .create
            .is_none());
    }

    #[test]
    fn checkpoint_defaults_to_zero_and_advances() {
        let (_kv, ledger) = ledger();
        assert_eq!(ledger.checkpoint(NET).unwrap(), 0);
        ledger.record_events(NET, &[], &[], 1234).unwrap();
        assert_eq!(ledger.checkpoint(NET).unwrap(), 1234);
        assert_eq!(ledger.checkpoint(NetworkId::new(2)).unwrap(), 0);
    }

    #[test]
    fn failure_between_events_and_checkpoint_leaves_nothing() {
        let (kv, ledger) = ledger();
        ledger.record_events(NET, &[], &[], 50).unwrap();

        // Two event writes land, then the commit fails before the checkpoint.
        kv.fail_commit_at_op(2);
        let result = ledger.record_events(
            NET,
            &[event("f1voter", "dev1", 100)],
            &[event("f1voter", "dev1", 90)],
            200,
        );
        assert!(matches!(result, Err(StoreError::Backend(_))));

        assert_eq!(ledger.checkpoint(NET).unwrap(), 50);
        let state = ledger.resolve(NET, &Address::new("f1voter"), 1_000).unwrap();
        assert_eq!(state, DelegationState::default());
    }

    #[test]
    fn undecodable_member_is_corruption() {
        let (kv, ledger) = ledger();
        let mut batch = WriteBatch::new();
        batch.zadd(keys::create_events(NET, &Address::new("f1voter")), 10, b"{not json".to_vec());
        kv.commit(batch).unwrap();

        let err = ledger.resolve(NET, &Address::new("f1voter"), 10).unwrap_err();
        assert!(matches!(err, StoreError::Corruption { .. }));
    }

    #[test]
    fn garbage_checkpoint_is_corruption() {
        let (kv, ledger) = ledger();
        kv.set(&keys::checkpoint(NET), b"tomorrow").unwrap();
        assert!(matches!(
            ledger.checkpoint(NET).unwrap_err(),
            StoreError::Corruption { .. }
        ));
    }
}
