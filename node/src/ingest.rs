//! The asynchronous writer of the snapshot cache.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use powersnap_ledger::SnapshotCache;
use powersnap_power::PowerEngine;
use powersnap_types::{NetworkId, Task};

use crate::{NodeError, NodeMetrics, TaskHandler};

/// Computes the snapshot a task names and stores it.
///
/// The snapshot is written before the synced date list is extended, so a
/// listed date always has a record behind it. Re-running a task rewrites the
/// same record.
pub struct SnapshotIngestor {
    engine: Arc<PowerEngine>,
    cache: Arc<SnapshotCache>,
    metrics: Arc<NodeMetrics>,
}

impl SnapshotIngestor {
    pub fn new(engine: Arc<PowerEngine>, cache: Arc<SnapshotCache>, metrics: Arc<NodeMetrics>) -> Self {
        Self {
            engine,
            cache,
            metrics,
        }
    }
}

#[async_trait]
impl TaskHandler for SnapshotIngestor {
    async fn handle(&self, network: NetworkId, task: &Task) -> Result<(), NodeError> {
        let power = self
            .engine
            .compute_snapshot(network, &task.address, task.date)
            .await?;
        let height = power.block_height;

        self.cache
            .set_power(network, &task.address, &BTreeMap::from([(task.date, power)]))?;
        self.metrics.snapshots_written.inc();

        let mut dates = self
            .cache
            .synced_dates_for(network, &task.address)?
            .unwrap_or_default();
        dates.push(task.date);
        dates.sort_unstable();
        dates.dedup();
        self.cache.set_synced_dates(network, &task.address, &dates)?;

        debug!(%network, address = %task.address, date = %task.date, height, "snapshot stored");
        Ok(())
    }
}
