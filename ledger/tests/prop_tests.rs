//! `resolve` agrees with a brute-force scan of the recorded events, on both
//! the in-memory and the LMDB backend.

use std::sync::Arc;

use proptest::prelude::*;

use powersnap_ledger::DelegationLedger;
use powersnap_nullables::NullKvStore;
use powersnap_store::KvStore;
use powersnap_store_lmdb::LmdbEnvironment;
use powersnap_types::{Address, DelegateEvent, NetworkId};

const NET: NetworkId = NetworkId::new(7);

fn event(handle: usize, height: i64) -> DelegateEvent {
    DelegateEvent {
        network: NET,
        voter_address: Address::new("f1voter"),
        handle: format!("dev{handle}"),
        block_height: height,
    }
}

fn expected_latest(events: &[DelegateEvent], max: i64) -> Option<i64> {
    events
        .iter()
        .map(|e| e.block_height)
        .filter(|h| *h <= max)
        .max()
}

fn check(kv: Arc<dyn KvStore>, creates: &[(usize, i64)], deletes: &[(usize, i64)], query: i64) -> Result<(), TestCaseError> {
    let ledger = DelegationLedger::new(kv);
    let creates: Vec<DelegateEvent> = creates.iter().map(|(h, b)| event(*h, *b)).collect();
    let deletes: Vec<DelegateEvent> = deletes.iter().map(|(h, b)| event(*h, *b)).collect();
    ledger.record_events(NET, &creates, &deletes, 10_000).unwrap();

    let state = ledger.resolve(NET, &Address::new("f1voter"), query).unwrap();
    let want_create = expected_latest(&creates, query);
    let want_delete = expected_latest(&deletes, query);

    prop_assert_eq!(state.create.as_ref().map(|e| e.block_height), want_create);
    prop_assert_eq!(state.delete.as_ref().map(|e| e.block_height), want_delete);
    let want_active = match (want_create, want_delete) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(c), Some(d)) => c >= d,
    };
    prop_assert_eq!(state.is_active(), want_active);
    Ok(())
}

fn events() -> impl Strategy<Value = Vec<(usize, i64)>> {
    prop::collection::vec((0usize..3, -50i64..500), 0..12)
}

proptest! {
    #[test]
    fn resolve_matches_naive_scan_in_memory(
        creates in events(),
        deletes in events(),
        query in -60i64..520,
    ) {
        check(Arc::new(NullKvStore::new()), &creates, &deletes, query)?;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn resolve_matches_naive_scan_on_lmdb(
        creates in events(),
        deletes in events(),
        query in -60i64..520,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).unwrap();
        check(Arc::new(env.kv_store()), &creates, &deletes, query)?;
    }
}
