//! sled-backed contract store, the conditional-write boundary
use crate::contract::{Contract, ContractStatus, Verification};
use crate::error::EngineError;
use sled::Db;
use std::sync::Arc;

/// Outcome of a compare-and-set attempt keyed on the current status
#[derive(Debug)]
pub enum CasOutcome {
    Applied(Contract),
    /// The row exists but its status no longer matches the predicate
    StatusMismatch(ContractStatus),
    Missing,
}

#[derive(Clone)]
pub struct ContractStore {
    instance: Arc<Db>,
}

impl ContractStore {
    pub fn new(instance: Arc<Db>) -> Self {
        Self { instance }
    }

    pub fn insert(&self, contract: &Contract) -> Result<(), EngineError> {
        let bytes = minicbor::to_vec(contract)?;
        self.instance.insert(contract.id.as_bytes(), bytes)?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<Contract>, EngineError> {
        match self.instance.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(minicbor::decode(bytes.as_ref())?)),
            None => Ok(None),
        }
    }

    /// Apply `mutate` only while the stored status equals `expected`.
    ///
    /// sled's compare_and_swap over the raw row bytes is the single
    /// serialisation point: of all concurrent callers, the store applies
    /// exactly one swap against any given current value. A caller that loses
    /// the swap re-reads and reports the status it found instead, it never
    /// assumes its own write went through.
    pub fn conditional_update(
        &self,
        id: &str,
        expected: ContractStatus,
        mutate: impl Fn(&mut Contract),
    ) -> Result<CasOutcome, EngineError> {
        loop {
            let Some(current_bytes) = self.instance.get(id.as_bytes())? else {
                return Ok(CasOutcome::Missing);
            };
            let current: Contract = minicbor::decode(current_bytes.as_ref())?;
            if current.status != expected {
                return Ok(CasOutcome::StatusMismatch(current.status));
            }

            let mut next = current;
            mutate(&mut next);
            let next_bytes = minicbor::to_vec(&next)?;

            match self
                .instance
                .compare_and_swap(id.as_bytes(), Some(current_bytes), Some(next_bytes))?
            {
                Ok(()) => return Ok(CasOutcome::Applied(next)),
                // lost the swap, somebody moved the row first. go round again:
                // either they only touched the verification sub-record and we
                // still match, or they changed the status and we report it.
                Err(_) => continue,
            }
        }
    }

    /// Compare-and-set merge restricted to the verification sub-record, so
    /// the anchoring service and the artifact pipeline can never move
    /// `status` by construction. Writing values identical to what is already
    /// stored is a no-op. Returns `None` when the row does not exist.
    pub fn update_verification(
        &self,
        id: &str,
        apply: impl Fn(&mut Option<Verification>),
    ) -> Result<Option<Contract>, EngineError> {
        loop {
            let Some(current_bytes) = self.instance.get(id.as_bytes())? else {
                return Ok(None);
            };
            let current: Contract = minicbor::decode(current_bytes.as_ref())?;

            let mut next = current.clone();
            apply(&mut next.verification);
            if next == current {
                // idempotent re-write, nothing to persist
                return Ok(Some(current));
            }
            let next_bytes = minicbor::to_vec(&next)?;

            match self
                .instance
                .compare_and_swap(id.as_bytes(), Some(current_bytes), Some(next_bytes))?
            {
                Ok(()) => return Ok(Some(next)),
                Err(_) => continue,
            }
        }
    }
}
