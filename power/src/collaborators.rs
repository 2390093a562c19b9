//! Interfaces of the services the engine calls out to.
//!
//! Amounts come back as decimal strings exactly as the chain node reports
//! them; an empty string means nothing was reported.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use powersnap_types::{AddrInfo, Address, BlockHeight, NetworkId};

/// A failure inside an external service. Treated as transient.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{service}: {message}")]
pub struct CollaboratorError {
    pub service: &'static str,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(service: &'static str, message: impl Into<String>) -> Self {
        Self {
            service,
            message: message.into(),
        }
    }
}

/// Balances of one actor at one height.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActorPower {
    pub wallet_balance: String,
    pub client_balance: String,
}

/// Opaque tipset identifier (the block CIDs of the tipset).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TipSetKey(pub Vec<String>);

impl fmt::Display for TipSetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0.join(","))
    }
}

/// Maps calendar days to the block height that closes them.
#[async_trait]
pub trait DateHeightSource: Send + Sync {
    async fn date_height_map(
        &self,
        network: NetworkId,
    ) -> Result<HashMap<NaiveDate, BlockHeight>, CollaboratorError>;
}

/// Address bookkeeping owned by the sync service.
#[async_trait]
pub trait AddressSync: Send + Sync {
    /// Bring the stored history of `address` up to date. Blocks until done.
    async fn sync_addr_power(&self, network: NetworkId, address: &Address) -> Result<(), CollaboratorError>;

    async fn addr_info(&self, network: NetworkId, address: &Address) -> Result<AddrInfo, CollaboratorError>;

    /// Balances of the actor rendered as `actor_id` (e.g. `f01234`).
    async fn actor_power(
        &self,
        actor_id: &str,
        network: NetworkId,
        height: BlockHeight,
    ) -> Result<ActorPower, CollaboratorError>;
}

/// Chain node RPC.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn tipset_by_height(&self, network: NetworkId, height: BlockHeight) -> Result<TipSetKey, CollaboratorError>;

    /// Raw-byte power of `provider_id` at `tipset`, as a decimal string.
    async fn miner_power_by_height(
        &self,
        network: NetworkId,
        provider_id: &str,
        tipset: &TipSetKey,
    ) -> Result<String, CollaboratorError>;
}

/// The engine's view of the outside world.
#[derive(Clone)]
pub struct Collaborators {
    pub heights: Arc<dyn DateHeightSource>,
    pub sync: Arc<dyn AddressSync>,
    pub chain: Arc<dyn ChainClient>,
}
