//! LMDB implementation of [`TaskQueue`].
//!
//! - `queue`: `network_be(8) ++ id_be(8)` → bincode [`Envelope`]. Keys sort by
//!   network and then by publish order, so a prefix scan yields arrival order.
//! - `dead_letters`: same key shape → bincode [`DeadLetter`].
//! - `consumers`: consumer name → bincode [`ConsumerConfig`].
//! - `meta["queue_seq"]`: last issued message id.
//!
//! Every operation is a single write transaction. LMDB serialises writers, so
//! two workers fetching concurrently never claim the same visible message.

use std::collections::BTreeMap;
use std::sync::Arc;

use heed::types::{Bytes, DecodeIgnore};
use heed::{Database, Env};
use serde::{Deserialize, Serialize};

use powersnap_store::{
    ConsumerConfig, DeadLetter, Delivery, MessageId, QueuePolicy, StoreError, TaskQueue,
};
use powersnap_types::{Clock, NetworkId, Task};

use crate::{LmdbEnvironment, LmdbError};

const QUEUE_SEQ_KEY: &[u8] = b"queue_seq";

/// Stored form of a pending message.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct Envelope {
    payload: Vec<u8>,
    /// How many times the message has been handed out.
    deliveries: u32,
    /// The message is invisible to consumers until this instant.
    visible_at_ms: u64,
}

fn message_key(network: NetworkId, id: MessageId) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&network.as_u64().to_be_bytes());
    key[8..].copy_from_slice(&id.0.to_be_bytes());
    key
}

fn message_id(key: &[u8]) -> MessageId {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&key[8..16]);
    MessageId(u64::from_be_bytes(buf))
}

pub struct LmdbTaskQueue {
    env: Env,
    queue_db: Database<Bytes, Bytes>,
    dead_letters_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
    /// Fixed at startup; never mutated afterwards.
    consumers: BTreeMap<NetworkId, ConsumerConfig>,
    clock: Arc<dyn Clock>,
}

impl LmdbTaskQueue {
    /// Create or update the consumer of every network in `networks`.
    ///
    /// Calling this again with the same arguments is a no-op; a changed policy
    /// overwrites the stored consumer definition.
    pub fn open(
        environment: &LmdbEnvironment,
        networks: &[NetworkId],
        policy: QueuePolicy,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let env = environment.env().clone();
        let mut consumers = BTreeMap::new();

        let mut wtxn = env.write_txn().map_err(LmdbError::from)?;
        for &network in networks {
            let config = ConsumerConfig::for_network(network, &policy);
            let existing = environment
                .consumers_db
                .get(&wtxn, config.name.as_bytes())
                .map_err(LmdbError::from)?
                .map(bincode::deserialize::<ConsumerConfig>)
                .transpose()
                .map_err(LmdbError::from)?;
            match existing {
                Some(ref stored) if stored == &config => {
                    tracing::debug!(consumer = %config.name, "consumer already up to date");
                }
                Some(_) => {
                    tracing::info!(consumer = %config.name, "updating consumer definition");
                }
                None => {
                    tracing::info!(consumer = %config.name, subject = %config.filter_subject, "creating consumer");
                }
            }
            if existing.as_ref() != Some(&config) {
                let bytes = bincode::serialize(&config).map_err(LmdbError::from)?;
                environment
                    .consumers_db
                    .put(&mut wtxn, config.name.as_bytes(), &bytes)
                    .map_err(LmdbError::from)?;
            }
            consumers.insert(network, config);
        }
        wtxn.commit().map_err(LmdbError::from)?;

        Ok(Self {
            env,
            queue_db: environment.queue_db,
            dead_letters_db: environment.dead_letters_db,
            meta_db: environment.meta_db,
            consumers,
            clock,
        })
    }

    fn consumer(&self, network: NetworkId) -> Result<&ConsumerConfig, StoreError> {
        self.consumers
            .get(&network)
            .ok_or(StoreError::UnknownConsumer(network.as_u64()))
    }

    /// Networks with a registered consumer.
    pub fn networks(&self) -> impl Iterator<Item = NetworkId> + '_ {
        self.consumers.keys().copied()
    }
}

impl TaskQueue for LmdbTaskQueue {
    fn enqueue(&self, network: NetworkId, task: &Task) -> Result<MessageId, StoreError> {
        let payload = task
            .to_payload()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let last = match self
            .meta_db
            .get(&wtxn, QUEUE_SEQ_KEY)
            .map_err(LmdbError::from)?
        {
            Some(bytes) if bytes.len() == 8 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(bytes);
                u64::from_be_bytes(buf)
            }
            Some(_) => return Err(StoreError::corruption("meta:queue_seq", "expected 8 bytes")),
            None => 0,
        };
        let id = MessageId(last + 1);

        let envelope = Envelope {
            payload,
            deliveries: 0,
            visible_at_ms: 0,
        };
        let bytes = bincode::serialize(&envelope).map_err(LmdbError::from)?;
        self.queue_db
            .put(&mut wtxn, &message_key(network, id), &bytes)
            .map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, QUEUE_SEQ_KEY, &id.0.to_be_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;

        tracing::debug!(%network, id = id.0, address = %task.address, date = %task.date, "task enqueued");
        Ok(id)
    }

    fn dequeue(&self, network: NetworkId, max_batch: usize) -> Result<Vec<Delivery>, StoreError> {
        let consumer = self.consumer(network)?;
        if max_batch == 0 {
            return Ok(Vec::new());
        }
        let now = self.clock.now_millis();
        let prefix = network.as_u64().to_be_bytes();

        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let mut visible: Vec<(MessageId, Envelope)> = Vec::new();
        let mut claimable = 0usize;
        {
            let iter = self
                .queue_db
                .prefix_iter(&wtxn, &prefix)
                .map_err(LmdbError::from)?;
            for entry in iter {
                let (key, value) = entry.map_err(LmdbError::from)?;
                let id = message_id(key);
                let envelope: Envelope = bincode::deserialize(value)
                    .map_err(|e| StoreError::corruption(format!("queue:{network}:{}", id.0), e))?;
                if envelope.visible_at_ms > now {
                    continue;
                }
                if envelope.deliveries < consumer.max_deliver {
                    claimable += 1;
                }
                visible.push((id, envelope));
                if claimable == max_batch {
                    break;
                }
            }
        }

        let mut deliveries = Vec::with_capacity(claimable);
        for (id, mut envelope) in visible {
            let key = message_key(network, id);
            let task = if envelope.deliveries < consumer.max_deliver {
                Task::from_payload(&envelope.payload).ok()
            } else {
                None
            };

            let Some(task) = task else {
                let dead = DeadLetter {
                    id,
                    network,
                    payload: envelope.payload,
                    deliveries: envelope.deliveries,
                    dead_at_ms: now,
                };
                tracing::error!(
                    %network,
                    id = id.0,
                    deliveries = dead.deliveries,
                    consumer = %consumer.name,
                    "task exhausted its delivery attempts or is undecodable; moved to dead letters"
                );
                let bytes = bincode::serialize(&dead).map_err(LmdbError::from)?;
                self.dead_letters_db
                    .put(&mut wtxn, &key, &bytes)
                    .map_err(LmdbError::from)?;
                self.queue_db
                    .delete(&mut wtxn, &key)
                    .map_err(LmdbError::from)?;
                continue;
            };

            envelope.deliveries += 1;
            envelope.visible_at_ms = now.saturating_add(consumer.ack_wait_ms);
            let bytes = bincode::serialize(&envelope).map_err(LmdbError::from)?;
            self.queue_db
                .put(&mut wtxn, &key, &bytes)
                .map_err(LmdbError::from)?;
            deliveries.push(Delivery {
                id,
                network,
                task,
                attempt: envelope.deliveries,
            });
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(deliveries)
    }

    fn ack(&self, network: NetworkId, id: MessageId) -> Result<bool, StoreError> {
        self.consumer(network)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let removed = self
            .queue_db
            .delete(&mut wtxn, &message_key(network, id))
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(removed)
    }

    fn nak(&self, network: NetworkId, id: MessageId) -> Result<bool, StoreError> {
        self.consumer(network)?;
        let key = message_key(network, id);
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let envelope = match self.queue_db.get(&wtxn, &key).map_err(LmdbError::from)? {
            Some(bytes) => bincode::deserialize::<Envelope>(bytes)
                .map_err(|e| StoreError::corruption(format!("queue:{network}:{}", id.0), e))?,
            None => return Ok(false),
        };
        let released = Envelope {
            visible_at_ms: 0,
            ..envelope
        };
        let bytes = bincode::serialize(&released).map_err(LmdbError::from)?;
        self.queue_db
            .put(&mut wtxn, &key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(true)
    }

    fn dead_letters(&self, network: NetworkId) -> Result<Vec<DeadLetter>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let prefix = network.as_u64().to_be_bytes();
        let iter = self
            .dead_letters_db
            .prefix_iter(&rtxn, &prefix)
            .map_err(LmdbError::from)?;
        let mut out = Vec::new();
        for entry in iter {
            let (key, value) = entry.map_err(LmdbError::from)?;
            let dead: DeadLetter = bincode::deserialize(value).map_err(|e| {
                StoreError::corruption(format!("dead_letters:{network}:{}", message_id(key).0), e)
            })?;
            out.push(dead);
        }
        Ok(out)
    }

    fn dead_letter_count(&self, network: NetworkId) -> Result<usize, StoreError> {
        count_prefix(&self.env, self.dead_letters_db, network)
    }

    fn pending(&self, network: NetworkId) -> Result<usize, StoreError> {
        count_prefix(&self.env, self.queue_db, network)
    }
}

/// Count the keys under `network` without touching the values.
fn count_prefix(env: &Env, db: Database<Bytes, Bytes>, network: NetworkId) -> Result<usize, StoreError> {
    let rtxn = env.read_txn().map_err(LmdbError::from)?;
    let prefix = network.as_u64().to_be_bytes();
    let iter = db
        .remap_data_type::<DecodeIgnore>()
        .prefix_iter(&rtxn, &prefix)
        .map_err(LmdbError::from)?;
    let mut count = 0;
    for entry in iter {
        entry.map_err(LmdbError::from)?;
        count += 1;
    }
    Ok(count)
}
