//! Property-based tests for terms validation and canonical hashing
//!
//! This module uses the proptest crate to verify that validation and the
//! canonicalizer behave correctly across a wide range of randomly generated
//! inputs, not just the specific cases the scenario tests pin down.

use forward_match::canonical;
use forward_match::contract::{
    ArtifactStatus, Contract, ContractKind, ContractStatus, DeliveryWindow, TermsDraft,
    Verification,
};
use forward_match::utils::new_uuid_to_bech32;
use proptest::prelude::*;

// PROPERTY TEST STRATEGIES

/// Strategy to generate plausible crop names
fn crop_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z]{3,12}"
}

/// Strategy to generate measurement units
fn unit_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("Qtl"), Just("Kg"), Just("Ton"), Just("Bag")]
}

/// Strategy to generate positive amounts (1 to 100_000_000)
fn amount_strategy() -> impl Strategy<Value = u64> {
    1u64..=100_000_000u64
}

/// Strategy to generate recognised delivery windows
fn window_strategy() -> impl Strategy<Value = DeliveryWindow> {
    prop_oneof![
        (1u32..=365).prop_map(DeliveryWindow::Days),
        (1u32..=52).prop_map(DeliveryWindow::Weeks),
        (1u32..=12).prop_map(DeliveryWindow::Months),
    ]
}

/// Strategy to generate market sides
fn kind_strategy() -> impl Strategy<Value = ContractKind> {
    prop::bool::ANY.prop_map(|b| {
        if b {
            ContractKind::OfferToSell
        } else {
            ContractKind::DemandToBuy
        }
    })
}

fn draft(crop: &str, quantity: u64, unit: &str, strike: u64, window: DeliveryWindow) -> TermsDraft {
    TermsDraft::new()
        .set_crop(crop)
        .set_quantity(quantity)
        .set_unit(unit)
        .set_strike_price(strike)
        .set_delivery_window(window)
}

// PROPERTY TESTS
proptest! {
    /// Property: fully populated terms with positive amounts always build
    #[test]
    fn prop_complete_terms_always_build(
        crop in crop_strategy(),
        quantity in amount_strategy(),
        unit in unit_strategy(),
        strike in amount_strategy(),
        window in window_strategy(),
    ) {
        let terms = draft(&crop, quantity, unit, strike, window).build();
        prop_assert!(terms.is_ok(), "valid terms rejected: {terms:?}");
    }

    /// Property: a zero quantity is rejected whatever else is set
    #[test]
    fn prop_zero_quantity_always_rejected(
        crop in crop_strategy(),
        unit in unit_strategy(),
        strike in amount_strategy(),
        window in window_strategy(),
    ) {
        prop_assert!(draft(&crop, 0, unit, strike, window).build().is_err());
    }

    /// Property: a zero strike price is rejected whatever else is set
    #[test]
    fn prop_zero_strike_always_rejected(
        crop in crop_strategy(),
        quantity in amount_strategy(),
        unit in unit_strategy(),
        window in window_strategy(),
    ) {
        prop_assert!(draft(&crop, quantity, unit, 0, window).build().is_err());
    }

    /// Property: the textual descriptor form round-trips through the parser
    #[test]
    fn prop_window_descriptor_roundtrips(window in window_strategy()) {
        let descriptor = window.to_string();
        prop_assert_eq!(descriptor.parse::<DeliveryWindow>(), Ok(window));
    }

    /// Property: canonical bytes are a pure function of contract content.
    /// Mutating lifecycle or verification state never moves the hash.
    #[test]
    fn prop_canonical_bytes_ignore_lifecycle_state(
        crop in crop_strategy(),
        quantity in amount_strategy(),
        unit in unit_strategy(),
        strike in amount_strategy(),
        window in window_strategy(),
        kind in kind_strategy(),
        artifact_published in prop::bool::ANY,
    ) {
        let terms = draft(&crop, quantity, unit, strike, window).build().unwrap();
        let contract = Contract::new(
            new_uuid_to_bech32("contract_").unwrap(),
            kind,
            terms,
            new_uuid_to_bech32("user_").unwrap(),
        );

        let baseline = canonical::canonical_bytes(&contract).unwrap();
        let hash = canonical::document_hash(&contract).unwrap();

        let mut mutated = contract.clone();
        mutated.status = ContractStatus::Cancelled;
        mutated.verification = Some(Verification {
            document_hash: hash.clone(),
            pseudo_tx_id: format!("0x{hash}"),
            explorer_url: format!("https://amoy.polygonscan.com/tx/0x{hash}"),
            artifact_ref: artifact_published.then(|| "bafy-prop-test".to_string()),
            artifact_status: if artifact_published {
                ArtifactStatus::Published
            } else {
                ArtifactStatus::Failed
            },
        });

        prop_assert_eq!(canonical::canonical_bytes(&mutated).unwrap(), baseline);
        prop_assert_eq!(canonical::document_hash(&mutated).unwrap(), hash);
    }

    /// Property: distinct content yields distinct hashes
    #[test]
    fn prop_document_hash_tracks_content(
        crop in crop_strategy(),
        quantity in 1u64..=99_999_999u64,
        unit in unit_strategy(),
        strike in amount_strategy(),
        window in window_strategy(),
    ) {
        let terms = draft(&crop, quantity, unit, strike, window).build().unwrap();
        let contract = Contract::new(
            new_uuid_to_bech32("contract_").unwrap(),
            ContractKind::OfferToSell,
            terms,
            new_uuid_to_bech32("user_").unwrap(),
        );

        let mut requantified = contract.clone();
        requantified.terms.quantity += 1;

        prop_assert_ne!(
            canonical::document_hash(&contract).unwrap(),
            canonical::document_hash(&requantified).unwrap()
        );
    }
}
