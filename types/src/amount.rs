//! Arbitrary-precision power amounts.
//!
//! On-chain balances (attoFIL) and raw-byte power overflow every machine word,
//! so every power component is a [`BigUint`]. Amounts cross process boundaries as
//! base-10 strings, both from collaborators and inside persisted JSON.

use num_bigint::BigUint;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{field} is not a non-negative integer: {value:?}")]
pub struct AmountError {
    pub field: &'static str,
    pub value: String,
}

/// Parse a decimal amount reported by a collaborator.
///
/// An empty string means "nothing reported" and yields `None`. Anything else
/// that is not a base-10 non-negative integer is an error, never zero.
pub fn parse_amount(field: &'static str, value: &str) -> Result<Option<BigUint>, AmountError> {
    if value.is_empty() {
        return Ok(None);
    }
    parse_digits(value).map(Some).ok_or_else(|| AmountError {
        field,
        value: value.to_string(),
    })
}

/// `BigUint::parse_bytes` tolerates `_` separators and a leading `+`; amounts
/// must be plain ASCII digits.
fn parse_digits(value: &str) -> Option<BigUint> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    BigUint::parse_bytes(value.as_bytes(), 10)
}

/// Serde adapter storing a [`BigUint`] as a decimal string.
pub mod decimal {
    use num_bigint::BigUint;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_digits(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid decimal amount {raw:?}")))
    }
}
