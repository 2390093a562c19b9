//! Power snapshot record.

use chrono::NaiveDate;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::amount::decimal;
use crate::{Address, BlockHeight};

/// Voting power of one address on one day, split by source.
///
/// A record is written once per (network, address, date) and never updated in
/// place; a later day gets its own record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPower {
    /// Linked GitHub account at computation time (empty when none).
    #[serde(default)]
    pub handle: String,
    pub address: Address,
    pub date: NaiveDate,
    #[serde(with = "decimal")]
    pub developer_power: BigUint,
    #[serde(with = "decimal")]
    pub sp_power: BigUint,
    #[serde(with = "decimal")]
    pub client_power: BigUint,
    #[serde(with = "decimal")]
    pub token_holder_power: BigUint,
    pub block_height: BlockHeight,
}

impl SyncPower {
    /// An all-zero snapshot for `address` at `block_height`.
    pub fn zero(address: Address, handle: String, date: NaiveDate, block_height: BlockHeight) -> Self {
        Self {
            handle,
            address,
            date,
            developer_power: BigUint::default(),
            sp_power: BigUint::default(),
            client_power: BigUint::default(),
            token_holder_power: BigUint::default(),
            block_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_are_persisted_as_decimal_strings() {
        let mut power = SyncPower::zero(
            Address::new("f1abc"),
            "dev1".to_string(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            4_000_000,
        );
        power.token_holder_power = BigUint::parse_bytes(b"123456789012345678901234567890", 10).unwrap();

        let json: serde_json::Value = serde_json::to_value(&power).unwrap();
        assert_eq!(json["token_holder_power"], "123456789012345678901234567890");
        assert_eq!(json["developer_power"], "0");
        assert_eq!(json["date"], "2024-06-01");

        let back: SyncPower = serde_json::from_value(json).unwrap();
        assert_eq!(back, power);
    }

    #[test]
    fn rejects_non_decimal_component() {
        let raw = r#"{"address":"f1abc","date":"2024-06-01","developer_power":"x",
            "sp_power":"0","client_power":"0","token_holder_power":"0","block_height":1}"#;
        assert!(serde_json::from_str::<SyncPower>(raw).is_err());
    }

    #[test]
    fn rejects_separated_or_signed_component() {
        for bad in ["1_000", "+5", ""] {
            let raw = format!(
                r#"{{"address":"f1abc","date":"2024-06-01","developer_power":"{bad}",
                "sp_power":"0","client_power":"0","token_holder_power":"0","block_height":1}}"#
            );
            assert!(serde_json::from_str::<SyncPower>(&raw).is_err(), "{bad:?} accepted");
        }
    }
}
