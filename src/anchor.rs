//! Anchoring service: reproducible hash-derived verification records
use crate::canonical;
use crate::contract::{ArtifactStatus, Contract, ContractStatus, Verification};
use crate::error::{EngineError, ValidationError};
use crate::store::ContractStore;
use tracing::info;

const EXPLORER_BASE: &str = "https://amoy.polygonscan.com/tx/";

/// Derive the full verification record from a contract's canonical content.
/// Pure: the same content always yields the same hash, tx id and url.
pub fn build_record(contract: &Contract) -> Result<Verification, EngineError> {
    let document_hash = canonical::document_hash(contract)?;
    // a deterministic tx-like id derived from the document hash
    let pseudo_tx_id = format!("0x{document_hash}");
    let explorer_url = format!("{EXPLORER_BASE}{pseudo_tx_id}");

    Ok(Verification {
        document_hash,
        pseudo_tx_id,
        explorer_url,
        artifact_ref: None,
        artifact_status: ArtifactStatus::Pending,
    })
}

pub struct AnchorService {
    store: ContractStore,
}

impl AnchorService {
    pub fn new(store: ContractStore) -> Self {
        Self { store }
    }

    /// Compute and persist the verification record for a contract that has
    /// left the `Created` state. Idempotent: anchoring an unchanged contract
    /// twice returns bit-identical hash, tx id and explorer url, and a
    /// result already recorded by the artifact pipeline is left alone.
    pub fn anchor(&self, contract_id: &str) -> Result<Verification, EngineError> {
        let Some(contract) = self.store.get(contract_id)? else {
            return Err(EngineError::NotFound(contract_id.to_string()));
        };
        if contract.status == ContractStatus::Created {
            // nothing to anchor yet, the counterparty set is not final
            return Err(EngineError::Conflict {
                current: contract.status,
            });
        }

        let record = build_record(&contract)?;
        let updated = self
            .store
            .update_verification(contract_id, |verification| match verification {
                Some(existing) => {
                    existing.document_hash = record.document_hash.clone();
                    existing.pseudo_tx_id = record.pseudo_tx_id.clone();
                    existing.explorer_url = record.explorer_url.clone();
                }
                None => *verification = Some(record.clone()),
            })?
            .ok_or_else(|| EngineError::NotFound(contract_id.to_string()))?;

        let verification = updated
            .verification
            .ok_or_else(|| anyhow::anyhow!("verification missing after anchor write"))?;

        info!(
            contract_id,
            document_hash = %verification.document_hash,
            "contract anchored"
        );
        Ok(verification)
    }

    /// Recompute the document hash and compare it against a caller-supplied
    /// digest. The claimed digest must at least look like a sha-256 hex
    /// string, everything else is reported as malformed rather than "false".
    pub fn verify(&self, contract_id: &str, claimed_hash: &str) -> Result<bool, EngineError> {
        let malformed = || ValidationError::MalformedDigest(claimed_hash.to_string());

        let decoded = hex::decode(claimed_hash).map_err(|_| malformed())?;
        if decoded.len() != 32 {
            return Err(malformed().into());
        }

        let Some(contract) = self.store.get(contract_id)? else {
            return Err(EngineError::NotFound(contract_id.to_string()));
        };
        let recomputed = canonical::document_hash(&contract)?;

        Ok(recomputed == claimed_hash.to_ascii_lowercase())
    }
}
