//! The power snapshot node: wires storage, queue, engine and workers together.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use powersnap_ledger::{DelegationLedger, SnapshotCache};
use powersnap_power::{Collaborators, PowerEngine};
use powersnap_store::{KvStore, MessageId, TaskQueue};
use powersnap_store_lmdb::LmdbEnvironment;
use powersnap_types::{Clock, NetworkId, Task};

use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::ingest::SnapshotIngestor;
use crate::metrics::NodeMetrics;
use crate::shutdown::ShutdownController;
use crate::worker::{SyncWorker, TaskHandler};

/// How long [`PowerNode::stop`] waits for workers to finish their batch.
const WORKER_STOP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PowerNode {
    config: NodeConfig,
    _env: LmdbEnvironment,
    queue: Arc<dyn TaskQueue>,
    cache: Arc<SnapshotCache>,
    ledger: Arc<DelegationLedger>,
    engine: Arc<PowerEngine>,
    ingestor: Arc<SnapshotIngestor>,
    metrics: Arc<NodeMetrics>,
    shutdown: Arc<ShutdownController>,
    workers: Vec<JoinHandle<()>>,
}

impl PowerNode {
    /// Open the LMDB environment at `config.data_dir` and build every
    /// subsystem. One queue consumer per configured network is created or
    /// updated. Call [`start`](Self::start) to run the workers.
    pub fn open(
        config: NodeConfig,
        collaborators: Collaborators,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, NodeError> {
        config.validate()?;

        let env = LmdbEnvironment::open(&config.data_dir, config.map_size)?;
        let kv: Arc<dyn KvStore> = Arc::new(env.kv_store());
        let queue: Arc<dyn TaskQueue> = Arc::new(env.task_queue(
            &config.networks,
            config.queue.policy(),
            clock.clone(),
        )?);

        let cache = Arc::new(SnapshotCache::new(kv.clone()));
        let ledger = Arc::new(DelegationLedger::new(kv));
        let engine = Arc::new(PowerEngine::new(
            cache.clone(),
            ledger.clone(),
            collaborators,
            clock,
            config.engine_config(),
        ));
        let metrics = Arc::new(NodeMetrics::new());
        let ingestor = Arc::new(SnapshotIngestor::new(
            engine.clone(),
            cache.clone(),
            metrics.clone(),
        ));

        tracing::info!(
            data_dir = %config.data_dir.display(),
            networks = ?config.networks,
            "power snapshot node opened"
        );

        Ok(Self {
            config,
            _env: env,
            queue,
            cache,
            ledger,
            engine,
            ingestor,
            metrics,
            shutdown: Arc::new(ShutdownController::new()),
            workers: Vec::new(),
        })
    }

    /// Spawn one sync worker per configured network.
    pub fn start(&mut self) {
        if !self.workers.is_empty() || self.shutdown.is_triggered() {
            return;
        }
        for &network in &self.config.networks {
            let worker = self.worker(network, self.ingestor.clone());
            self.workers.push(tokio::spawn(worker.run(self.shutdown.subscribe())));
        }
        tracing::info!(workers = self.workers.len(), "sync workers started");
    }

    /// Signal the workers and wait for them to finish.
    pub async fn stop(&mut self) -> Result<(), NodeError> {
        self.shutdown.shutdown();
        let workers = std::mem::take(&mut self.workers);
        let joined = tokio::time::timeout(WORKER_STOP_TIMEOUT, async {
            for handle in workers {
                if let Err(e) = handle.await {
                    tracing::error!(error = %e, "sync worker panicked");
                }
            }
        })
        .await;
        if joined.is_err() {
            return Err(NodeError::ShutdownTimeout);
        }
        tracing::info!("power snapshot node stopped");
        Ok(())
    }

    /// A worker for `network` driving `handler`, configured from this node.
    pub fn worker(&self, network: NetworkId, handler: Arc<dyn TaskHandler>) -> SyncWorker {
        SyncWorker::new(
            network,
            self.queue.clone(),
            handler,
            self.metrics.clone(),
            self.config.queue.fetch_batch,
            self.config.queue.poll_interval(),
        )
    }

    /// Queue a sync task for `network`.
    pub fn enqueue(&self, network: NetworkId, task: &Task) -> Result<MessageId, NodeError> {
        let id = self.queue.enqueue(network, task)?;
        self.metrics.tasks_enqueued.inc();
        Ok(id)
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn queue(&self) -> Arc<dyn TaskQueue> {
        self.queue.clone()
    }

    pub fn cache(&self) -> Arc<SnapshotCache> {
        self.cache.clone()
    }

    pub fn ledger(&self) -> Arc<DelegationLedger> {
        self.ledger.clone()
    }

    pub fn engine(&self) -> Arc<PowerEngine> {
        self.engine.clone()
    }

    pub fn ingestor(&self) -> Arc<SnapshotIngestor> {
        self.ingestor.clone()
    }

    pub fn metrics(&self) -> Arc<NodeMetrics> {
        self.metrics.clone()
    }

    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        self.shutdown.clone()
    }
}
