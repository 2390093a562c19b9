//! Network identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies which chain a record belongs to (e.g. `314` for mainnet,
/// `314159` for calibration). Every persisted key is namespaced by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(u64);

impl NetworkId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Queue subject carrying this network's tasks.
    pub fn task_subject(&self) -> String {
        format!("tasks.{}", self.0)
    }

    /// Name of the single durable consumer draining this network's subject.
    pub fn consumer_name(&self) -> String {
        format!("processor-{}", self.0)
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NetworkId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}
