//! Developer-power delegation events and their as-of resolution.

use serde::{Deserialize, Serialize};

use crate::{Address, BlockHeight, NetworkId};

/// A create or delete delegation event emitted by the on-chain oracle contract.
///
/// Both kinds share one shape; which series an event belongs to is decided by
/// the list it is recorded in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateEvent {
    pub network: NetworkId,
    pub voter_address: Address,
    /// GitHub account the voter delegated developer power from.
    pub handle: String,
    pub block_height: BlockHeight,
}

/// The latest create and delete events at or below some height.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DelegationState {
    pub create: Option<DelegateEvent>,
    pub delete: Option<DelegateEvent>,
}

impl DelegationState {
    /// Whether the delegation is in force.
    ///
    /// A create at the same height as a delete wins.
    pub fn is_active(&self) -> bool {
        match (&self.create, &self.delete) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(create), Some(delete)) => create.block_height >= delete.block_height,
        }
    }

    /// Handle of the active delegation, if any.
    pub fn active_handle(&self) -> Option<&str> {
        if self.is_active() {
            self.create.as_ref().map(|c| c.handle.as_str())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(height: BlockHeight) -> DelegateEvent {
        DelegateEvent {
            network: NetworkId::new(1),
            voter_address: Address::new("f1voter"),
            handle: "dev1".to_string(),
            block_height: height,
        }
    }

    #[test]
    fn no_create_is_inactive() {
        let state = DelegationState {
            create: None,
            delete: Some(event(10)),
        };
        assert!(!state.is_active());
        assert_eq!(state.active_handle(), None);
    }

    #[test]
    fn create_without_delete_is_active() {
        let state = DelegationState {
            create: Some(event(10)),
            delete: None,
        };
        assert_eq!(state.active_handle(), Some("dev1"));
    }

    #[test]
    fn later_delete_revokes() {
        let state = DelegationState {
            create: Some(event(100)),
            delete: Some(event(200)),
        };
        assert!(!state.is_active());
    }

    #[test]
    fn create_wins_ties() {
        let state = DelegationState {
            create: Some(event(100)),
            delete: Some(event(100)),
        };
        assert!(state.is_active());
    }
}
