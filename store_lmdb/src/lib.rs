//! LMDB backend for the power snapshot service.
//!
//! Implements [`KvStore`](powersnap_store::KvStore) and
//! [`TaskQueue`](powersnap_store::TaskQueue) on top of the `heed` LMDB bindings.
//! All logical structures share one environment, so a write batch spanning
//! hashes, ordered sets and plain values commits in a single transaction.

pub mod environment;
pub mod error;
pub mod kv;
pub mod queue;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use kv::LmdbKvStore;
pub use queue::LmdbTaskQueue;
