//! Durable, partitioned, at-least-once task queue.
//!
//! Tasks are published per network on subject `tasks.<network>` and drained by
//! exactly one named consumer per network (`processor-<network>`). Retention is
//! work-queue style: an acknowledged message is deleted.
//!
//! A claimed message that is not acknowledged within [`QueuePolicy::ack_wait`]
//! becomes visible again. After [`QueuePolicy::max_deliver`] deliveries the
//! message is moved to the network's dead-letter table instead of being handed
//! out again.

use std::time::Duration;

use powersnap_types::{NetworkId, Task};
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Identifier of a published message, unique across the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

/// Redelivery policy shared by every consumer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueuePolicy {
    pub ack_wait: Duration,
    pub max_deliver: u32,
}

impl Default for QueuePolicy {
    /// One redelivery per minute for roughly a day.
    fn default() -> Self {
        Self {
            ack_wait: Duration::from_secs(60),
            max_deliver: 1440,
        }
    }
}

/// Persisted consumer definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerConfig {
    pub name: String,
    pub network: NetworkId,
    pub filter_subject: String,
    pub ack_wait_ms: u64,
    pub max_deliver: u32,
}

impl ConsumerConfig {
    pub fn for_network(network: NetworkId, policy: &QueuePolicy) -> Self {
        Self {
            name: network.consumer_name(),
            network,
            filter_subject: network.task_subject(),
            ack_wait_ms: policy.ack_wait.as_millis() as u64,
            max_deliver: policy.max_deliver,
        }
    }
}

/// A claimed message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub id: MessageId,
    pub network: NetworkId,
    pub task: Task,
    /// 1 on first delivery.
    pub attempt: u32,
}

/// A message that ran out of delivery attempts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub id: MessageId,
    pub network: NetworkId,
    pub payload: Vec<u8>,
    pub deliveries: u32,
    pub dead_at_ms: u64,
}

pub trait TaskQueue: Send + Sync {
    /// Durably append `task` to the network's subject.
    fn enqueue(&self, network: NetworkId, task: &Task) -> Result<MessageId, StoreError>;

    /// Claim up to `max_batch` visible messages for the network's consumer.
    /// An empty vector means nothing is ready.
    fn dequeue(&self, network: NetworkId, max_batch: usize) -> Result<Vec<Delivery>, StoreError>;

    /// Acknowledge and delete a message. Returns `false` if it was already gone.
    fn ack(&self, network: NetworkId, id: MessageId) -> Result<bool, StoreError>;

    /// Release a claimed message for immediate redelivery.
    fn nak(&self, network: NetworkId, id: MessageId) -> Result<bool, StoreError>;

    /// Messages of `network` that exhausted their delivery attempts.
    fn dead_letters(&self, network: NetworkId) -> Result<Vec<DeadLetter>, StoreError>;

    /// Number of dead letters of `network`, without decoding them.
    fn dead_letter_count(&self, network: NetworkId) -> Result<usize, StoreError>;

    /// Number of messages still pending (claimed or not) for `network`.
    fn pending(&self, network: NetworkId) -> Result<usize, StoreError>;
}
