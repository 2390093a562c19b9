//! The read path: cached snapshot or catch-up computation, then delegation gating.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use num_bigint::BigUint;
use tracing::{debug, warn};

use powersnap_ledger::{DelegationLedger, SnapshotCache};
use powersnap_types::{parse_amount, Address, BlockHeight, Clock, NetworkId, SyncPower};

use crate::{Collaborators, PowerError};

/// How far back snapshots are kept and served by default.
pub const DEFAULT_MAX_LOOKBACK_DAYS: u32 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_lookback_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_lookback_days: DEFAULT_MAX_LOOKBACK_DAYS,
        }
    }
}

/// Every cached snapshot of one day plus that day's developer power total.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DailyAggregate {
    pub addresses: Vec<SyncPower>,
    pub developer_power: Option<BigUint>,
}

/// Read-only aggregation over the cache, the ledger and the collaborators.
///
/// Holds no locks. Two concurrent misses for the same key both recompute,
/// which is harmless since nothing here writes.
pub struct PowerEngine {
    cache: Arc<SnapshotCache>,
    ledger: Arc<DelegationLedger>,
    collaborators: Collaborators,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl PowerEngine {
    pub fn new(
        cache: Arc<SnapshotCache>,
        ledger: Arc<DelegationLedger>,
        collaborators: Collaborators,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            cache,
            ledger,
            collaborators,
            clock,
            config,
        }
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Power of `address` as of `day_count` days ago.
    pub async fn address_power(
        &self,
        network: NetworkId,
        address: &Address,
        day_count: u32,
    ) -> Result<SyncPower, PowerError> {
        let out_of_range = PowerError::LookbackOutOfRange {
            days: i64::from(day_count),
            max: self.config.max_lookback_days,
        };
        if day_count > self.config.max_lookback_days {
            return Err(out_of_range);
        }
        let date = self
            .clock
            .today()
            .checked_sub_days(Days::new(u64::from(day_count)))
            .ok_or(out_of_range)?;
        self.address_power_by_day(network, address, date).await
    }

    /// Power of `address` on `date`.
    ///
    /// Served from the cache when possible. On a miss the address is synced and
    /// the snapshot computed from the chain; that result is returned but not
    /// stored. In both cases the developer component is then replaced by what
    /// the delegation ledger allows at the snapshot's height.
    pub async fn address_power_by_day(
        &self,
        network: NetworkId,
        address: &Address,
        date: NaiveDate,
    ) -> Result<SyncPower, PowerError> {
        self.check_lookback(date)?;

        let mut power = match self.cache.power_on(network, address, date)? {
            Some(power) => power,
            None => {
                debug!(%network, %address, %date, "snapshot cache miss, catching up");
                self.collaborators.sync.sync_addr_power(network, address).await?;
                self.compute_snapshot(network, address, date).await?
            }
        };

        self.apply_delegation(network, &mut power)?;
        Ok(power)
    }

    /// Compute a fresh snapshot from the chain, with the provisional developer power.
    pub async fn compute_snapshot(
        &self,
        network: NetworkId,
        address: &Address,
        date: NaiveDate,
    ) -> Result<SyncPower, PowerError> {
        let height = self.date_height(network, date).await?;
        let info = self.collaborators.sync.addr_info(network, address).await?;
        let handle = info.handle.clone().unwrap_or_default();
        let mut power = SyncPower::zero(address.clone(), handle, date, height);

        for actor in info.actor_addresses() {
            let balances = self.collaborators.sync.actor_power(&actor, network, height).await?;
            if let Some(wallet) = parse_amount("wallet_balance", &balances.wallet_balance)? {
                power.token_holder_power += wallet;
            }
            if let Some(client) = parse_amount("client_balance", &balances.client_balance)? {
                power.client_power += client;
            }
        }

        if !info.provider_ids.is_empty() {
            let tipset = self.collaborators.chain.tipset_by_height(network, height).await?;
            for provider in info.provider_addresses() {
                let raw = self
                    .collaborators
                    .chain
                    .miner_power_by_height(network, &provider, &tipset)
                    .await?;
                if let Some(sp) = parse_amount("raw_byte_power", &raw)? {
                    power.sp_power += sp;
                }
            }
        }

        if !power.handle.is_empty() {
            if let Some(weight) = self.cache.weight(date, &power.handle)? {
                power.developer_power = BigUint::from(weight);
            }
        }

        debug!(%network, %address, %date, height, "computed snapshot");
        Ok(power)
    }

    /// Block height that closes `date` on `network`.
    pub async fn date_height(&self, network: NetworkId, date: NaiveDate) -> Result<BlockHeight, PowerError> {
        let heights = self.collaborators.heights.date_height_map(network).await?;
        heights
            .get(&date)
            .copied()
            .ok_or(PowerError::HeightNotFound { network, date })
    }

    /// All cached snapshots of `date` on `network`, ordered by address.
    pub async fn daily_aggregate(&self, network: NetworkId, date: NaiveDate) -> Result<DailyAggregate, PowerError> {
        let mut addresses = Vec::new();
        for (address, dates) in self.cache.synced_dates(network)? {
            if !dates.contains(&date) {
                continue;
            }
            if let Some(power) = self.cache.power_on(network, &address, date)? {
                addresses.push(power);
            }
        }
        let developer_power = self.cache.developer_power(date)?;
        Ok(DailyAggregate {
            addresses,
            developer_power,
        })
    }

    fn check_lookback(&self, date: NaiveDate) -> Result<(), PowerError> {
        let days = self.clock.today().signed_duration_since(date).num_days();
        let max = self.config.max_lookback_days;
        if days < 0 || days > i64::from(max) {
            return Err(PowerError::LookbackOutOfRange { days, max });
        }
        Ok(())
    }

    fn apply_delegation(&self, network: NetworkId, power: &mut SyncPower) -> Result<(), PowerError> {
        let state = self.ledger.resolve(network, &power.address, power.block_height)?;
        let Some(handle) = state.active_handle().filter(|h| !h.is_empty()) else {
            power.developer_power = BigUint::default();
            return Ok(());
        };

        match self.cache.developer_weights(power.date)? {
            None => warn!(
                %network,
                address = %power.address,
                date = %power.date,
                handle,
                "no developer weights synced for date, keeping provisional developer power"
            ),
            Some(table) => {
                if let Some(weight) = table.get(handle) {
                    power.developer_power = BigUint::from(*weight);
                }
            }
        }
        Ok(())
    }
}
