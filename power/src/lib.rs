//! Voting power aggregation.
//!
//! [`PowerEngine`] answers "what was the power of this address on this day":
//! the cached snapshot when there is one, otherwise a catch-up computation
//! through the chain collaborators. Either way the developer component is
//! finally gated by the delegation ledger as of the snapshot's block height.

pub mod collaborators;
pub mod engine;
pub mod error;
#[cfg(any(test, feature = "nullable"))]
pub mod null_collaborators;


pub use collaborators::{
    ActorPower, AddressSync, ChainClient, CollaboratorError, Collaborators, DateHeightSource,
    TipSetKey,
};
pub use engine::{DailyAggregate, EngineConfig, PowerEngine};
pub use error::PowerError;
#[cfg(any(test, feature = "nullable"))]
pub use null_collaborators::NullCollaborators;
