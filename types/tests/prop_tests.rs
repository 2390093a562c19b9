use proptest::prelude::*;

use powersnap_types::{parse_amount, Address, DelegateEvent, DelegationState, NetworkId};

fn event(height: i64) -> DelegateEvent {
    DelegateEvent {
        network: NetworkId::new(1),
        voter_address: Address::new("f1voter"),
        handle: "dev".to_string(),
        block_height: height,
    }
}

proptest! {
    /// Any machine-sized decimal is accepted with its exact value.
    #[test]
    fn parse_amount_accepts_u128(value in any::<u128>()) {
        let parsed = parse_amount("balance", &value.to_string()).unwrap().unwrap();
        prop_assert_eq!(parsed.to_str_radix(10), value.to_string());
    }

    /// Strings containing a non-digit are always rejected.
    #[test]
    fn parse_amount_rejects_letters(prefix in "[0-9]{0,8}", suffix in "[a-z]{1,4}") {
        let raw = format!("{prefix}{suffix}");
        prop_assert!(parse_amount("balance", &raw).is_err());
    }

    /// Activity depends only on create >= delete.
    #[test]
    fn activity_matches_height_order(create in -1000i64..1000, delete in -1000i64..1000) {
        let state = DelegationState {
            create: Some(event(create)),
            delete: Some(event(delete)),
        };
        prop_assert_eq!(state.is_active(), create >= delete);
    }
}
