//! Abstract storage traits for the power snapshot service.
//!
//! Every backend (LMDB, in-memory for testing) implements these traits. The
//! rest of the codebase depends only on the traits and on the key layout in
//! [`keys`].

pub mod error;
pub mod keys;
pub mod kv;
pub mod queue;

pub use error::StoreError;
pub use kv::{KvOp, KvStore, WriteBatch};
pub use queue::{ConsumerConfig, DeadLetter, Delivery, MessageId, QueuePolicy, TaskQueue};
