//! Prometheus metrics for the node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`] so several nodes (or tests)
//! in one process never collide on metric names.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_vec_with_registry, Histogram, HistogramOpts, IntCounter, IntGaugeVec, Opts,
    Registry,
};

/// Central collection of all node-level Prometheus metrics.
pub struct NodeMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Sync tasks appended to the queue.
    pub tasks_enqueued: IntCounter,
    /// Sync tasks handled and acknowledged.
    pub tasks_processed: IntCounter,
    /// Sync task attempts that failed and were left for redelivery.
    pub tasks_failed: IntCounter,
    /// Power snapshots written into the cache.
    pub snapshots_written: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Dead-lettered tasks, labelled by network.
    pub dead_letters: IntGaugeVec,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time spent handling one sync task, in milliseconds.
    pub task_process_time_ms: Histogram,
}

impl NodeMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let tasks_enqueued = register_int_counter_with_registry!(
            Opts::new("powersnap_tasks_enqueued_total", "Sync tasks enqueued"),
            registry
        )
        .expect("failed to register tasks_enqueued counter");

        let tasks_processed = register_int_counter_with_registry!(
            Opts::new(
                "powersnap_tasks_processed_total",
                "Sync tasks processed and acknowledged"
            ),
            registry
        )
        .expect("failed to register tasks_processed counter");

        let tasks_failed = register_int_counter_with_registry!(
            Opts::new(
                "powersnap_tasks_failed_total",
                "Sync task attempts that failed"
            ),
            registry
        )
        .expect("failed to register tasks_failed counter");

        let snapshots_written = register_int_counter_with_registry!(
            Opts::new(
                "powersnap_snapshots_written_total",
                "Power snapshots written to the cache"
            ),
            registry
        )
        .expect("failed to register snapshots_written counter");

        let dead_letters = register_int_gauge_vec_with_registry!(
            Opts::new(
                "powersnap_dead_letters",
                "Tasks that exhausted their delivery attempts"
            ),
            &["network"],
            registry
        )
        .expect("failed to register dead_letters gauge");

        // 1 ms → ~16 s.
        let task_process_time_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "powersnap_task_process_time_ms",
                "Sync task processing time in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(1.0, 2.0, 15).expect("valid bucket layout")),
            registry
        )
        .expect("failed to register task_process_time_ms histogram");

        Self {
            registry,
            tasks_enqueued,
            tasks_processed,
            tasks_failed,
            snapshots_written,
            dead_letters,
            task_process_time_ms,
        }
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
