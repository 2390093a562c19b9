//! Per-network sync workers.
//!
//! A worker claims a batch from its network's queue consumer, hands each task
//! to the [`TaskHandler`] and acknowledges the ones that succeeded. Failed
//! tasks are left unacknowledged: the queue redelivers them after its ack
//! wait, and dead-letters them once they run out of attempts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

use powersnap_store::TaskQueue;
use powersnap_types::{NetworkId, Task};

use crate::{NodeError, NodeMetrics};

/// Does the work a queued task stands for.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, network: NetworkId, task: &Task) -> Result<(), NodeError>;
}

pub struct SyncWorker {
    network: NetworkId,
    queue: Arc<dyn TaskQueue>,
    handler: Arc<dyn TaskHandler>,
    metrics: Arc<NodeMetrics>,
    batch_size: usize,
    poll_interval: Duration,
}

impl SyncWorker {
    pub fn new(
        network: NetworkId,
        queue: Arc<dyn TaskQueue>,
        handler: Arc<dyn TaskHandler>,
        metrics: Arc<NodeMetrics>,
        batch_size: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            network,
            queue,
            handler,
            metrics,
            batch_size,
            poll_interval,
        }
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    /// Claim and handle one batch. Returns how many tasks were claimed.
    pub async fn process_batch(&self) -> Result<usize, NodeError> {
        let deliveries = self.queue.dequeue(self.network, self.batch_size)?;
        let claimed = deliveries.len();

        for delivery in deliveries {
            let started = Instant::now();
            match self.handler.handle(self.network, &delivery.task).await {
                Ok(()) => {
                    self.queue.ack(self.network, delivery.id)?;
                    self.metrics.tasks_processed.inc();
                    debug!(
                        network = %self.network,
                        id = delivery.id.0,
                        address = %delivery.task.address,
                        date = %delivery.task.date,
                        "task done"
                    );
                }
                Err(e) => {
                    self.metrics.tasks_failed.inc();
                    warn!(
                        network = %self.network,
                        id = delivery.id.0,
                        attempt = delivery.attempt,
                        address = %delivery.task.address,
                        date = %delivery.task.date,
                        error = %e,
                        "task failed, leaving it for redelivery"
                    );
                }
            }
            self.metrics
                .task_process_time_ms
                .observe(started.elapsed().as_secs_f64() * 1000.0);
        }

        let dead = self.queue.dead_letter_count(self.network)?;
        let label = self.network.to_string();
        self.metrics
            .dead_letters
            .with_label_values(&[label.as_str()])
            .set(dead as i64);

        Ok(claimed)
    }

    /// Poll until `shutdown` fires. Sleeps `poll_interval` whenever a fetch
    /// comes back empty or fails.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(network = %self.network, consumer = %self.network.consumer_name(), "sync worker started");

        loop {
            let claimed = match self.process_batch().await {
                Ok(claimed) => claimed,
                Err(e) => {
                    error!(network = %self.network, error = %e, "sync worker fetch failed");
                    0
                }
            };

            if claimed > 0 {
                match shutdown.try_recv() {
                    Err(TryRecvError::Empty) => continue,
                    _ => break,
                }
            }

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!(network = %self.network, "sync worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use chrono::NaiveDate;
    use powersnap_nullables::NullClock;
    use powersnap_store::QueuePolicy;
    use powersnap_store_lmdb::LmdbEnvironment;
    use powersnap_types::Address;

    const NET: NetworkId = NetworkId::new(7);

    /// Records tasks and fails for addresses listed in `fail_for`.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Task>>,
        fail_for: Vec<Address>,
    }

    #[async_trait]
    impl TaskHandler for Recorder {
        async fn handle(&self, _network: NetworkId, task: &Task) -> Result<(), NodeError> {
            self.seen.lock().unwrap().push(task.clone());
            if self.fail_for.contains(&task.address) {
                return Err(NodeError::Config("scripted failure".into()));
            }
            Ok(())
        }
    }

    fn task(addr: &str) -> Task {
        Task::new(addr, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    fn setup(
        recorder: Arc<Recorder>,
        max_deliver: u32,
    ) -> (tempfile::TempDir, Arc<dyn TaskQueue>, Arc<NullClock>, Arc<NodeMetrics>, SyncWorker) {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).unwrap();
        let clock = Arc::new(NullClock::new(1_000_000));
        let policy = QueuePolicy {
            ack_wait: Duration::from_secs(60),
            max_deliver,
        };
        let queue: Arc<dyn TaskQueue> = Arc::new(env.task_queue(&[NET], policy, clock.clone()).unwrap());
        let metrics = Arc::new(NodeMetrics::new());
        let worker = SyncWorker::new(
            NET,
            queue.clone(),
            recorder,
            metrics.clone(),
            10,
            Duration::from_millis(5),
        );
        (dir, queue, clock, metrics, worker)
    }

    #[tokio::test]
    async fn successful_tasks_are_acked() {
        let recorder = Arc::new(Recorder::default());
        let (_dir, queue, _clock, metrics, worker) = setup(recorder.clone(), 3);
        queue.enqueue(NET, &task("f1a")).unwrap();
        queue.enqueue(NET, &task("f1b")).unwrap();

        assert_eq!(worker.process_batch().await.unwrap(), 2);
        assert_eq!(worker.process_batch().await.unwrap(), 0);
        assert_eq!(queue.pending(NET).unwrap(), 0);
        assert_eq!(metrics.tasks_processed.get(), 2);
        assert_eq!(recorder.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_tasks_are_retried_then_dead_lettered() {
        let recorder = Arc::new(Recorder {
            fail_for: vec![Address::new("f1bad")],
            ..Recorder::default()
        });
        let (_dir, queue, clock, metrics, worker) = setup(recorder.clone(), 2);
        queue.enqueue(NET, &task("f1bad")).unwrap();

        assert_eq!(worker.process_batch().await.unwrap(), 1);
        assert_eq!(queue.pending(NET).unwrap(), 1);
        // Not visible again until the ack wait has passed.
        assert_eq!(worker.process_batch().await.unwrap(), 0);

        clock.advance_millis(60_000);
        assert_eq!(worker.process_batch().await.unwrap(), 1);

        clock.advance_millis(60_000);
        assert_eq!(worker.process_batch().await.unwrap(), 0);
        assert_eq!(queue.pending(NET).unwrap(), 0);
        assert_eq!(queue.dead_letters(NET).unwrap().len(), 1);
        assert_eq!(metrics.tasks_failed.get(), 2);
        assert_eq!(metrics.dead_letters.with_label_values(&["7"]).get(), 1);
        assert_eq!(recorder.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let recorder = Arc::new(Recorder::default());
        let (_dir, queue, _clock, _metrics, worker) = setup(recorder.clone(), 3);
        queue.enqueue(NET, &task("f1a")).unwrap();

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(worker.run(rx));

        for _ in 0..200 {
            if queue.pending(NET).unwrap() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(queue.pending(NET).unwrap(), 0);

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker should stop")
            .unwrap();
    }
}
