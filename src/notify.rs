//! Best-effort notification dispatch to counterparties
use crate::contract::Contract;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ContractCreated,
    ContractAccepted,
    ContractCancelled,
    ContractExpired,
}

/// Human-facing payload handed to the dispatcher alongside the event
#[derive(Debug, Clone)]
pub struct Notification {
    pub contract_id: String,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn for_event(event: EventKind, contract: &Contract) -> Self {
        let t = &contract.terms;
        let (title, message) = match event {
            EventKind::ContractCreated => (
                "Contract Created",
                format!(
                    "Your {} contract for {} {} has been created successfully.",
                    t.crop, t.quantity, t.unit
                ),
            ),
            EventKind::ContractAccepted => (
                "Contract Accepted",
                format!(
                    "The {} contract for {} {} was accepted at {}/{}.",
                    t.crop, t.quantity, t.unit, t.strike_price, t.unit
                ),
            ),
            EventKind::ContractCancelled => (
                "Contract Cancelled",
                format!("The {} contract for {} {} was cancelled.", t.crop, t.quantity, t.unit),
            ),
            EventKind::ContractExpired => (
                "Contract Expired",
                format!(
                    "The {} contract for {} {} expired without acceptance.",
                    t.crop, t.quantity, t.unit
                ),
            ),
        };

        Self {
            contract_id: contract.id.clone(),
            title: title.to_string(),
            message,
        }
    }
}

/// Seam to the external dispatcher. Delivery is best effort with no
/// guarantee; the coordinator logs and swallows whatever comes back.
pub trait Notifier: Send + Sync {
    fn notify(&self, party_id: &str, event: EventKind, note: &Notification) -> anyhow::Result<()>;
}

/// Dispatcher that writes events to the log. Stands in wherever no external
/// dispatcher is wired up.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, party_id: &str, event: EventKind, note: &Notification) -> anyhow::Result<()> {
        info!(
            party_id,
            contract_id = %note.contract_id,
            "{:?}: {} - {}",
            event,
            note.title,
            note.message
        );
        Ok(())
    }
}
