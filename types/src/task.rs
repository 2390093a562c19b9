//! Sync work items carried by the task queue.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Address;

/// "Compute and store the snapshot of `address` for `date`."
///
/// The network is implied by the queue subject the task was published on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub address: Address,
    pub date: NaiveDate,
}

impl Task {
    pub fn new(address: impl Into<Address>, date: NaiveDate) -> Self {
        Self {
            address: address.into(),
            date,
        }
    }

    /// JSON payload published to the queue.
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_payload(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_json_with_iso_date() {
        let task = Task::new("f1abc", NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        let payload = task.to_payload().unwrap();
        assert_eq!(
            std::str::from_utf8(&payload).unwrap(),
            r#"{"address":"f1abc","date":"2024-05-02"}"#
        );
        assert_eq!(Task::from_payload(&payload).unwrap(), task);
    }
}
