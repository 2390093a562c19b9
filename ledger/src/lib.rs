//! Persistent state of the power snapshot service.
//!
//! Two views over one [`KvStore`](powersnap_store::KvStore):
//! - [`SnapshotCache`]: synced-date bookkeeping, computed power snapshots and
//!   the daily developer-weight tables.
//! - [`DelegationLedger`]: per-address create/delete delegation events ordered
//!   by block height, plus the per-network ingestion checkpoint, answering
//!   "as of height H" queries.
//!
//! Absent data is `None`/empty/zero, never an error. A stored value that does
//! not decode is [`StoreError::Corruption`](powersnap_store::StoreError).

pub mod cache;
pub mod delegation;

pub use cache::SnapshotCache;
pub use delegation::DelegationLedger;
