//! Deterministic canonical snapshot of a contract's legal content
use crate::contract::{Contract, ContractKind, DeliveryWindow, TimeStamp};
use crate::error::EngineError;
use chrono::Utc;

/// The exact field set that defines a contract's legal content, encoded in
/// this fixed order. Lifecycle state, `accepted_at` and the verification
/// sub-record live outside the snapshot and can never reach the encoder.
#[derive(minicbor::Encode, Debug)]
pub struct CanonicalSnapshot<'a> {
    #[n(0)]
    id: &'a str,
    #[n(1)]
    kind: ContractKind,
    #[n(2)]
    crop: &'a str,
    #[n(3)]
    quantity: u64,
    #[n(4)]
    unit: &'a str,
    #[n(5)]
    strike_price: u64,
    #[n(6)]
    delivery_window: DeliveryWindow,
    #[n(7)]
    offering_party: &'a str,
    #[n(8)]
    accepting_party: Option<&'a str>,
    #[n(9)]
    created_at: &'a TimeStamp<Utc>,
}

impl<'a> CanonicalSnapshot<'a> {
    pub fn of(contract: &'a Contract) -> Self {
        Self {
            id: &contract.id,
            kind: contract.kind,
            crop: &contract.terms.crop,
            quantity: contract.terms.quantity,
            unit: &contract.terms.unit,
            strike_price: contract.terms.strike_price,
            delivery_window: contract.terms.delivery_window,
            offering_party: &contract.offering_party,
            accepting_party: contract.accepting_party.as_deref(),
            created_at: &contract.created_at,
        }
    }
}

/// Stable byte encoding of the snapshot. Two calls on logically identical
/// content produce byte-identical output, across restarts and machines.
pub fn canonical_bytes(contract: &Contract) -> Result<Vec<u8>, EngineError> {
    Ok(minicbor::to_vec(CanonicalSnapshot::of(contract))?)
}

/// Hex-encoded sha-256 over the canonical bytes
pub fn document_hash(contract: &Contract) -> Result<String, EngineError> {
    let bytes = canonical_bytes(contract)?;
    Ok(sha256::digest(&bytes))
}
