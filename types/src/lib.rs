//! Fundamental types for the power snapshot service.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! network ids, addresses and their on-chain identity, power snapshots, delegation
//! events, queue tasks, and the clock abstraction.

pub mod address;
pub mod amount;
pub mod delegation;
pub mod network;
pub mod power;
pub mod task;
pub mod time;

pub use address::{AddrInfo, Address};
pub use amount::{parse_amount, AmountError};
pub use delegation::{DelegateEvent, DelegationState};
pub use network::NetworkId;
pub use power::SyncPower;
pub use task::Task;
pub use time::{format_date, parse_date, Clock, SystemClock};

/// Block height on the chain. Signed so that pre-genesis sentinels stay representable.
pub type BlockHeight = i64;
