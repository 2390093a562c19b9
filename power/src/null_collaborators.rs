//! Scriptable in-memory stand-ins for the chain services.
//!
//! Unknown addresses resolve to an identity with no actors, unknown actors and
//! providers report empty strings, and every call is counted so tests can
//! assert which services were touched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use powersnap_types::{AddrInfo, Address, BlockHeight, NetworkId};

use crate::collaborators::{
    ActorPower, AddressSync, ChainClient, CollaboratorError, Collaborators, DateHeightSource,
    TipSetKey,
};

#[derive(Default)]
struct Script {
    heights: HashMap<NetworkId, HashMap<NaiveDate, BlockHeight>>,
    infos: HashMap<Address, AddrInfo>,
    actors: HashMap<String, ActorPower>,
    providers: HashMap<String, String>,
    failing: Option<&'static str>,
}

#[derive(Default)]
pub struct NullCollaborators {
    script: Mutex<Script>,
    sync_calls: AtomicUsize,
    tipset_calls: AtomicUsize,
    actor_calls: AtomicUsize,
}

impl NullCollaborators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_height(&self, network: NetworkId, date: NaiveDate, height: BlockHeight) {
        self.script
            .lock()
            .unwrap()
            .heights
            .entry(network)
            .or_default()
            .insert(date, height);
    }

    pub fn set_addr_info(&self, info: AddrInfo) {
        self.script.lock().unwrap().infos.insert(info.address.clone(), info);
    }

    /// Balances reported for `actor_id` at any height.
    pub fn set_actor_power(&self, actor_id: &str, wallet_balance: &str, client_balance: &str) {
        self.script.lock().unwrap().actors.insert(
            actor_id.to_string(),
            ActorPower {
                wallet_balance: wallet_balance.to_string(),
                client_balance: client_balance.to_string(),
            },
        );
    }

    pub fn set_miner_power(&self, provider_id: &str, raw_byte_power: &str) {
        self.script
            .lock()
            .unwrap()
            .providers
            .insert(provider_id.to_string(), raw_byte_power.to_string());
    }

    /// Make every call to `service` fail; `None` heals it.
    ///
    /// Service names: `heights`, `sync`, `chain`.
    pub fn fail_service(&self, service: Option<&'static str>) {
        self.script.lock().unwrap().failing = service;
    }

    pub fn sync_calls(&self) -> usize {
        self.sync_calls.load(Ordering::SeqCst)
    }

    pub fn tipset_calls(&self) -> usize {
        self.tipset_calls.load(Ordering::SeqCst)
    }

    pub fn actor_calls(&self) -> usize {
        self.actor_calls.load(Ordering::SeqCst)
    }

    /// Wire this fake in as every collaborator.
    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            heights: self.clone(),
            sync: self.clone(),
            chain: self.clone(),
        }
    }

    fn check(&self, service: &'static str) -> Result<(), CollaboratorError> {
        if self.script.lock().unwrap().failing == Some(service) {
            return Err(CollaboratorError::new(service, "scripted failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl DateHeightSource for NullCollaborators {
    async fn date_height_map(
        &self,
        network: NetworkId,
    ) -> Result<HashMap<NaiveDate, BlockHeight>, CollaboratorError> {
        self.check("heights")?;
        Ok(self
            .script
            .lock()
            .unwrap()
            .heights
            .get(&network)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl AddressSync for NullCollaborators {
    async fn sync_addr_power(&self, _network: NetworkId, _address: &Address) -> Result<(), CollaboratorError> {
        self.check("sync")?;
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn addr_info(&self, _network: NetworkId, address: &Address) -> Result<AddrInfo, CollaboratorError> {
        self.check("sync")?;
        let info = self.script.lock().unwrap().infos.get(address).cloned();
        Ok(info.unwrap_or_else(|| AddrInfo {
            address: address.clone(),
            ..AddrInfo::default()
        }))
    }

    async fn actor_power(
        &self,
        actor_id: &str,
        _network: NetworkId,
        _height: BlockHeight,
    ) -> Result<ActorPower, CollaboratorError> {
        self.check("sync")?;
        self.actor_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .script
            .lock()
            .unwrap()
            .actors
            .get(actor_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ChainClient for NullCollaborators {
    async fn tipset_by_height(&self, _network: NetworkId, height: BlockHeight) -> Result<TipSetKey, CollaboratorError> {
        self.check("chain")?;
        self.tipset_calls.fetch_add(1, Ordering::SeqCst);
        Ok(TipSetKey(vec![format!("tipset-{height}")]))
    }

    async fn miner_power_by_height(
        &self,
        _network: NetworkId,
        provider_id: &str,
        _tipset: &TipSetKey,
    ) -> Result<String, CollaboratorError> {
        self.check("chain")?;
        Ok(self
            .script
            .lock()
            .unwrap()
            .providers
            .get(provider_id)
            .cloned()
            .unwrap_or_default())
    }
}
