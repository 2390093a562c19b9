//! Power snapshot node.
//!
//! The node is the process-level coordinator that:
//! - Opens the LMDB environment and the per-network task queue
//! - Runs one sync worker per configured network
//! - Writes computed snapshots into the cache through the ingestor
//! - Serves power queries through the aggregation engine

pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod shutdown;
pub mod worker;

pub use config::{NodeConfig, QueueConfig};
pub use error::NodeError;
pub use ingest::SnapshotIngestor;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::PowerNode;
pub use shutdown::ShutdownController;
pub use worker::{SyncWorker, TaskHandler};
