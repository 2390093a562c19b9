//! Persisted key layout.
//!
//! Other tooling reads these keys directly, so the shapes are a contract:
//!
//! | Data                   | Key                                            | Structure                     |
//! |------------------------|------------------------------------------------|-------------------------------|
//! | Synced dates           | `power_snapshot:{net}:synced_dates`            | hash: address → `d1,d2,...`   |
//! | Power snapshots        | `power_snapshot:{net}:{addr}:power`            | hash: date → JSON `SyncPower` |
//! | Developer weights      | `power_snapshot:developer_weights`             | hash: date → JSON map         |
//! | Developer power totals | `power_snapshot:developer_power`               | hash: date → decimal          |
//! | Checkpoint             | `power_snapshot:{net}:checkpoint`              | decimal height                |
//! | Create events          | `power_snapshot:{net}:{addr}:delegate:create`  | ordered set by height         |
//! | Delete events          | `power_snapshot:{net}:{addr}:delegate:delete`  | ordered set by height         |

use powersnap_types::{Address, NetworkId};

const NAMESPACE: &str = "power_snapshot";

pub fn synced_dates(network: NetworkId) -> String {
    format!("{NAMESPACE}:{network}:synced_dates")
}

pub fn address_power(network: NetworkId, address: &Address) -> String {
    format!("{NAMESPACE}:{network}:{address}:power")
}

pub fn developer_weights() -> String {
    format!("{NAMESPACE}:developer_weights")
}

pub fn developer_power() -> String {
    format!("{NAMESPACE}:developer_power")
}

pub fn checkpoint(network: NetworkId) -> String {
    format!("{NAMESPACE}:{network}:checkpoint")
}

pub fn create_events(network: NetworkId, address: &Address) -> String {
    format!("{NAMESPACE}:{network}:{address}:delegate:create")
}

pub fn delete_events(network: NetworkId, address: &Address) -> String {
    format!("{NAMESPACE}:{network}:{address}:delegate:delete")
}
