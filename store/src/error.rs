use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation. Transient.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A stored value exists but does not decode as the expected record.
    #[error("corrupted record at {key}: {reason}")]
    Corruption { key: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("no consumer registered for network {0}")]
    UnknownConsumer(u64),
}

impl StoreError {
    pub fn corruption(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::Corruption {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}
