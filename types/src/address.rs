//! Wallet addresses and their resolved on-chain identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A wallet address as it appears on chain (e.g. `f1abc...` or `0x...`).
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identity of an address as reported by the chain indexer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddrInfo {
    pub address: Address,
    /// Linked GitHub account, if the holder registered one.
    pub handle: Option<String>,
    /// Wallet/client actor ids owned by the address.
    pub actor_ids: Vec<u64>,
    /// Storage-provider (miner) ids owned by the address.
    pub provider_ids: Vec<u64>,
    /// Prefix used to render numeric ids as chain addresses (`f0`, `t0`).
    pub id_prefix: String,
}

impl AddrInfo {
    /// Actor ids rendered as chain id-addresses.
    pub fn actor_addresses(&self) -> impl Iterator<Item = String> + '_ {
        self.actor_ids
            .iter()
            .map(move |id| format!("{}{}", self.id_prefix, id))
    }

    /// Provider ids rendered as chain id-addresses.
    pub fn provider_addresses(&self) -> impl Iterator<Item = String> + '_ {
        self.provider_ids
            .iter()
            .map(move |id| format!("{}{}", self.id_prefix, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_rendered_with_prefix() {
        let info = AddrInfo {
            address: Address::new("f1holder"),
            handle: None,
            actor_ids: vec![1001, 1002],
            provider_ids: vec![7],
            id_prefix: "t0".to_string(),
        };
        let actors: Vec<String> = info.actor_addresses().collect();
        assert_eq!(actors, vec!["t01001", "t01002"]);
        assert_eq!(info.provider_addresses().collect::<Vec<_>>(), vec!["t07"]);
    }

    #[test]
    fn default_info_has_no_identity() {
        let info = AddrInfo::default();
        assert_eq!(info.address, Address::default());
        assert_eq!(info.address.as_str(), "");
        assert!(info.handle.is_none());
        assert_eq!(info.actor_addresses().count(), 0);
    }
}
