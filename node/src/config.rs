//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use powersnap_power::EngineConfig;
use powersnap_store::QueuePolicy;
use powersnap_types::NetworkId;

use crate::{LogFormat, NodeError};

/// Configuration for a power snapshot node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Directory holding the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Networks to run a sync worker and queue consumer for.
    #[serde(default = "default_networks")]
    pub networks: Vec<NetworkId>,

    #[serde(default)]
    pub queue: QueueConfig,

    /// Oldest day, relative to today, that power queries may ask about.
    #[serde(default = "default_max_lookback_days")]
    pub max_lookback_days: u32,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Task queue redelivery and polling settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Seconds a claimed task may stay unacknowledged before redelivery.
    #[serde(default = "default_ack_wait_secs")]
    pub ack_wait_secs: u64,

    /// Deliveries after which a task is dead-lettered.
    #[serde(default = "default_max_deliver")]
    pub max_deliver: u32,

    /// Tasks claimed per fetch.
    #[serde(default = "default_fetch_batch")]
    pub fetch_batch: usize,

    /// Idle sleep between fetches when the queue is empty.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./powersnap_data")
}

fn default_map_size() -> usize {
    1024 * 1024 * 1024
}

fn default_networks() -> Vec<NetworkId> {
    vec![NetworkId::new(314), NetworkId::new(314159)]
}

fn default_max_lookback_days() -> u32 {
    powersnap_power::engine::DEFAULT_MAX_LOOKBACK_DAYS
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ack_wait_secs() -> u64 {
    60
}

fn default_max_deliver() -> u32 {
    1440
}

fn default_fetch_batch() -> usize {
    10
}

fn default_poll_interval_ms() -> u64 {
    1000
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        self.parsed_log_format()?;
        if self.queue.max_deliver == 0 {
            return Err(NodeError::Config("queue.max_deliver must be at least 1".into()));
        }
        if self.queue.fetch_batch == 0 {
            return Err(NodeError::Config("queue.fetch_batch must be at least 1".into()));
        }
        let mut networks = self.networks.clone();
        networks.sort();
        networks.dedup();
        if networks.len() != self.networks.len() {
            return Err(NodeError::Config("networks must not repeat".into()));
        }
        Ok(())
    }

    pub fn parsed_log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse().map_err(NodeError::Config)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_lookback_days: self.max_lookback_days,
        }
    }
}

impl QueueConfig {
    pub fn policy(&self) -> QueuePolicy {
        QueuePolicy {
            ack_wait: Duration::from_secs(self.ack_wait_secs),
            max_deliver: self.max_deliver,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size: default_map_size(),
            networks: default_networks(),
            queue: QueueConfig::default(),
            max_lookback_days: default_max_lookback_days(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            ack_wait_secs: default_ack_wait_secs(),
            max_deliver: default_max_deliver(),
            fetch_batch: default_fetch_batch(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}
