//! Matching coordinator: contract creation and the accept/cancel/expire
//! state transitions
use crate::contract::{Contract, ContractKind, ContractStatus, TermsDraft, TimeStamp};
use crate::error::{EngineError, ValidationError};
use crate::notify::{EventKind, Notification, Notifier};
use crate::pipeline::PublishTask;
use crate::store::{CasOutcome, ContractStore};
use crate::utils;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

const CONTRACT_HRP: &str = "contract_";

pub struct MatchService {
    store: ContractStore,
    notifier: Arc<dyn Notifier>,
    publish_queue: mpsc::Sender<PublishTask>,
}

impl MatchService {
    pub fn new(
        store: ContractStore,
        notifier: Arc<dyn Notifier>,
        publish_queue: mpsc::Sender<PublishTask>,
    ) -> Self {
        Self {
            store,
            notifier,
            publish_queue,
        }
    }

    /// Open a new contract proposal in the `Created` state. The creator owns
    /// the offering slot regardless of which side of the market it is on;
    /// the accepting slot stays empty until someone wins the race.
    pub fn create(
        &self,
        kind: ContractKind,
        draft: TermsDraft,
        party_id: &str,
    ) -> Result<Contract, EngineError> {
        if party_id.trim().is_empty() {
            return Err(ValidationError::EmptyParty.into());
        }
        let terms = draft.build()?;

        let id = utils::new_uuid_to_bech32(CONTRACT_HRP)?;
        let contract = Contract::new(id, kind, terms, party_id.to_string());
        self.store.insert(&contract)?;

        info!(contract_id = %contract.id, ?kind, "contract created");
        self.dispatch(party_id, EventKind::ContractCreated, &contract);

        Ok(contract)
    }

    /// Bind an accepting counterparty. Of all concurrent callers on the same
    /// contract exactly one observes success; every other caller gets
    /// `Conflict`, never a silent no-op and never a dual acceptance. The
    /// store's conditional write is the only arbiter, nothing here locks.
    pub fn accept(&self, contract_id: &str, accepting_party: &str) -> Result<Contract, EngineError> {
        if accepting_party.trim().is_empty() {
            return Err(ValidationError::EmptyParty.into());
        }
        // a party cannot take the other side of its own contract. the owner
        // slot is immutable, so this pre-read cannot race with the swap below
        match self.store.get(contract_id)? {
            None => return Err(EngineError::NotFound(contract_id.to_string())),
            Some(c) if c.offering_party == accepting_party => {
                return Err(ValidationError::SelfAcceptance.into());
            }
            Some(_) => {}
        }

        let accepted_at = TimeStamp::new();
        let outcome =
            self.store
                .conditional_update(contract_id, ContractStatus::Created, |contract| {
                    contract.status = ContractStatus::Accepted;
                    contract.accepting_party = Some(accepting_party.to_string());
                    contract.accepted_at = Some(accepted_at.clone());
                })?;

        let contract = match outcome {
            CasOutcome::Applied(contract) => contract,
            CasOutcome::Missing => return Err(EngineError::NotFound(contract_id.to_string())),
            CasOutcome::StatusMismatch(current) => return Err(EngineError::Conflict { current }),
        };

        info!(contract_id = %contract.id, accepting_party, "contract accepted");

        // hand the canonical document off to the background publisher. the
        // acceptance is already committed, so a full or closed queue only
        // costs the automatic publish, which stays retryable by hand
        let task = PublishTask {
            contract_id: contract.id.clone(),
        };
        if let Err(e) = self.publish_queue.try_send(task) {
            warn!(contract_id = %contract.id, "publish task not enqueued: {e}");
        }

        self.dispatch(
            &contract.offering_party,
            EventKind::ContractAccepted,
            &contract,
        );
        self.dispatch(accepting_party, EventKind::ContractAccepted, &contract);

        Ok(contract)
    }

    /// Withdraw a still-open contract. Only the creating party may cancel,
    /// and only while nobody has accepted.
    pub fn cancel(&self, contract_id: &str, requesting_party: &str) -> Result<Contract, EngineError> {
        let Some(current) = self.store.get(contract_id)? else {
            return Err(EngineError::NotFound(contract_id.to_string()));
        };
        if current.offering_party != requesting_party {
            // not this caller's contract to withdraw
            return Err(EngineError::Conflict {
                current: current.status,
            });
        }

        let contract = self.transition(contract_id, ContractStatus::Cancelled)?;
        self.dispatch(requesting_party, EventKind::ContractCancelled, &contract);
        Ok(contract)
    }

    /// Time out a still-open contract. Invoked by an external scheduler once
    /// the delivery window has lapsed without acceptance.
    pub fn expire(&self, contract_id: &str) -> Result<Contract, EngineError> {
        let contract = self.transition(contract_id, ContractStatus::Expired)?;
        self.dispatch(
            &contract.offering_party,
            EventKind::ContractExpired,
            &contract,
        );
        Ok(contract)
    }

    pub fn get(&self, contract_id: &str) -> Result<Contract, EngineError> {
        self.store
            .get(contract_id)?
            .ok_or_else(|| EngineError::NotFound(contract_id.to_string()))
    }

    // the two owner-side terminal transitions share the same conditional
    // write shape: leave Created, touch nothing else
    fn transition(
        &self,
        contract_id: &str,
        terminal: ContractStatus,
    ) -> Result<Contract, EngineError> {
        let outcome =
            self.store
                .conditional_update(contract_id, ContractStatus::Created, |contract| {
                    contract.status = terminal;
                })?;

        match outcome {
            CasOutcome::Applied(contract) => {
                info!(contract_id = %contract.id, status = ?terminal, "contract closed");
                Ok(contract)
            }
            CasOutcome::Missing => Err(EngineError::NotFound(contract_id.to_string())),
            CasOutcome::StatusMismatch(current) => Err(EngineError::Conflict { current }),
        }
    }

    // best effort: a failed notification never rolls back a committed write
    fn dispatch(&self, party_id: &str, event: EventKind, contract: &Contract) {
        let note = Notification::for_event(event, contract);
        if let Err(e) = self.notifier.notify(party_id, event, &note) {
            warn!(contract_id = %contract.id, party_id, "notification dropped: {e}");
        }
    }
}
