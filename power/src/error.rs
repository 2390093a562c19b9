use chrono::NaiveDate;
use thiserror::Error;

use powersnap_store::StoreError;
use powersnap_types::{AmountError, NetworkId};

use crate::CollaboratorError;

#[derive(Debug, Error)]
pub enum PowerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("lookback of {days} days is outside 0..={max}")]
    LookbackOutOfRange { days: i64, max: u32 },

    #[error("no block height known for {date} on network {network}")]
    HeightNotFound { network: NetworkId, date: NaiveDate },

    #[error("invalid number: {0}")]
    InvalidNumber(#[from] AmountError),

    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),
}
