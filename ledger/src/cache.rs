//! Snapshot cache store: what has been synced and what the answer was.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use num_bigint::BigUint;

use powersnap_store::{keys, KvStore, StoreError, WriteBatch};
use powersnap_types::{format_date, parse_date, Address, BlockHeight, NetworkId, SyncPower};

use crate::delegation::read_checkpoint;

/// GitHub account → developer weight for one day.
pub type WeightTable = BTreeMap<String, u64>;

pub struct SnapshotCache {
    kv: Arc<dyn KvStore>,
}

impl SnapshotCache {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    // ── Synced dates ────────────────────────────────────────────────────

    /// Every address of `network` with the dates already synced for it.
    pub fn synced_dates(
        &self,
        network: NetworkId,
    ) -> Result<BTreeMap<Address, Vec<NaiveDate>>, StoreError> {
        let key = keys::synced_dates(network);
        self.kv
            .hgetall(&key)?
            .into_iter()
            .map(|(addr, raw)| -> Result<_, StoreError> {
                Ok((Address::new(addr), decode_dates(&key, &raw)?))
            })
            .collect()
    }

    pub fn synced_dates_for(
        &self,
        network: NetworkId,
        address: &Address,
    ) -> Result<Option<Vec<NaiveDate>>, StoreError> {
        let key = keys::synced_dates(network);
        self.kv
            .hget(&key, address.as_str())?
            .map(|raw| decode_dates(&key, &raw))
            .transpose()
    }

    /// Replace the synced date list of `address`. Merging is the caller's job.
    pub fn set_synced_dates(
        &self,
        network: NetworkId,
        address: &Address,
        dates: &[NaiveDate],
    ) -> Result<(), StoreError> {
        let joined = dates
            .iter()
            .map(|d| format_date(*d))
            .collect::<Vec<_>>()
            .join(",");
        self.kv
            .hset(&keys::synced_dates(network), address.as_str(), joined.as_bytes())
    }

    // ── Power snapshots ─────────────────────────────────────────────────

    /// All cached snapshots of `address`, keyed by date. Empty when none.
    pub fn power(
        &self,
        network: NetworkId,
        address: &Address,
    ) -> Result<BTreeMap<NaiveDate, SyncPower>, StoreError> {
        let key = keys::address_power(network, address);
        self.kv
            .hgetall(&key)?
            .into_iter()
            .map(|(field, raw)| -> Result<_, StoreError> {
                let date = parse_date(&field)
                    .ok_or_else(|| StoreError::corruption(&key, format!("bad date field {field:?}")))?;
                Ok((date, decode_power(&key, &raw)?))
            })
            .collect()
    }

    /// The cached snapshot of `address` for one date.
    pub fn power_on(
        &self,
        network: NetworkId,
        address: &Address,
        date: NaiveDate,
    ) -> Result<Option<SyncPower>, StoreError> {
        let key = keys::address_power(network, address);
        self.kv
            .hget(&key, &format_date(date))?
            .map(|raw| decode_power(&key, &raw))
            .transpose()
    }

    /// Write the given date entries, leaving other dates untouched.
    pub fn set_power(
        &self,
        network: NetworkId,
        address: &Address,
        entries: &BTreeMap<NaiveDate, SyncPower>,
    ) -> Result<(), StoreError> {
        let key = keys::address_power(network, address);
        let mut batch = WriteBatch::new();
        for (date, power) in entries {
            let json = serde_json::to_vec(power).map_err(|e| StoreError::Serialization(e.to_string()))?;
            batch.hset(key.as_str(), format_date(*date), json);
        }
        self.kv.commit(batch)
    }

    // ── Developer weights ───────────────────────────────────────────────

    /// The weight table of `date`, or `None` if it has not been computed yet.
    pub fn developer_weights(&self, date: NaiveDate) -> Result<Option<WeightTable>, StoreError> {
        let key = keys::developer_weights();
        self.kv
            .hget(&key, &format_date(date))?
            .map(|raw| serde_json::from_slice(&raw).map_err(|e| StoreError::corruption(&key, e)))
            .transpose()
    }

    /// Weight of one handle on `date`. `None` covers both a missing table and
    /// a missing handle; use [`weights_exist`](Self::weights_exist) to tell them apart.
    pub fn weight(&self, date: NaiveDate, handle: &str) -> Result<Option<u64>, StoreError> {
        Ok(self
            .developer_weights(date)?
            .and_then(|table| table.get(handle).copied()))
    }

    pub fn set_developer_weights(&self, date: NaiveDate, table: &WeightTable) -> Result<(), StoreError> {
        let json = serde_json::to_vec(table).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.kv
            .hset(&keys::developer_weights(), &format_date(date), &json)
    }

    pub fn weights_exist(&self, date: NaiveDate) -> Result<bool, StoreError> {
        self.kv.hexists(&keys::developer_weights(), &format_date(date))
    }

    // ── Daily developer power total ─────────────────────────────────────

    pub fn set_developer_power(&self, date: NaiveDate, total: &BigUint) -> Result<(), StoreError> {
        self.kv.hset(
            &keys::developer_power(),
            &format_date(date),
            total.to_str_radix(10).as_bytes(),
        )
    }

    pub fn developer_power(&self, date: NaiveDate) -> Result<Option<BigUint>, StoreError> {
        let key = keys::developer_power();
        self.kv
            .hget(&key, &format_date(date))?
            .map(|raw| {
                BigUint::parse_bytes(&raw, 10)
                    .ok_or_else(|| StoreError::corruption(&key, "developer power is not an integer"))
            })
            .transpose()
    }

    // ── Checkpoint ──────────────────────────────────────────────────────

    /// Delegation ingestion checkpoint of `network`; 0 when unset.
    pub fn checkpoint(&self, network: NetworkId) -> Result<BlockHeight, StoreError> {
        read_checkpoint(self.kv.as_ref(), network)
    }
}

fn decode_dates(key: &str, raw: &[u8]) -> Result<Vec<NaiveDate>, StoreError> {
    let joined = std::str::from_utf8(raw).map_err(|e| StoreError::corruption(key, e))?;
    if joined.is_empty() {
        return Ok(Vec::new());
    }
    joined
        .split(',')
        .map(|d| parse_date(d).ok_or_else(|| StoreError::corruption(key, format!("bad date {d:?}"))))
        .collect()
}

fn decode_power(key: &str, raw: &[u8]) -> Result<SyncPower, StoreError> {
    serde_json::from_slice(raw).map_err(|e| StoreError::corruption(key, e))
}
