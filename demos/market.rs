//! End-to-end walkthrough: open an offer, accept it, anchor and verify it.
//! The artifact store is not expected to be reachable here, so the publish
//! step demonstrates the degraded path unless ARTIFACT_STORE_URL points at a
//! live endpoint.

use forward_match::anchor::AnchorService;
use forward_match::contract::{ContractKind, TermsDraft};
use forward_match::notify::LogNotifier;
use forward_match::pipeline::{ArtifactClient, ArtifactConfig, Publisher};
use forward_match::service::MatchService;
use forward_match::store::ContractStore;
use forward_match::utils;
use std::sync::Arc;
use tokio::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_tracing();

    let temp_dir = tempfile::tempdir()?;
    let db = Arc::new(sled::open(temp_dir.path().join("market.db"))?);
    let store = ContractStore::new(db);

    let client = ArtifactClient::with_config(ArtifactConfig {
        max_retries: 2,
        base_retry_delay: Duration::from_millis(200),
        request_timeout: Duration::from_secs(2),
        ..ArtifactConfig::default()
    });
    let (queue, worker) = Publisher::start(store.clone(), client, 32);
    let service = MatchService::new(store.clone(), Arc::new(LogNotifier), queue);
    let anchor = AnchorService::new(store.clone());

    let farmer = utils::new_uuid_to_bech32("user_")?;
    let buyer = utils::new_uuid_to_bech32("user_")?;

    let draft = TermsDraft::new()
        .set_crop("Soybean")
        .set_quantity(50)
        .set_unit("Qtl")
        .set_strike_price(4800)
        .parse_delivery_window("30 Days")?;

    let contract = service.create(ContractKind::OfferToSell, draft, &farmer)?;
    println!("created {} ({:?})", contract.id, contract.status);

    let accepted = service.accept(&contract.id, &buyer)?;
    println!(
        "accepted by {} ({:?})",
        accepted.accepting_party.as_deref().unwrap_or("?"),
        accepted.status
    );

    let record = anchor.anchor(&accepted.id)?;
    println!("document hash : {}", record.document_hash);
    println!("pseudo tx id  : {}", record.pseudo_tx_id);
    println!("explorer url  : {}", record.explorer_url);

    let authentic = anchor.verify(&accepted.id, &record.document_hash)?;
    println!("verification  : {}", if authentic { "authentic" } else { "tampered" });

    // closing the queue lets the worker drain outstanding publish tasks
    drop(service);
    worker.await?;

    let settled = store.get(&accepted.id)?.expect("contract vanished");
    if let Some(verification) = settled.verification {
        println!("artifact      : {:?} ({:?})", verification.artifact_ref, verification.artifact_status);
    }

    Ok(())
}
