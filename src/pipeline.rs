//! Artifact pipeline: asynchronous publication of canonical contract
//! documents to a content-addressed store
use crate::anchor;
use crate::canonical;
use crate::contract::{ArtifactStatus, Contract, ContractStatus};
use crate::error::EngineError;
use crate::store::ContractStore;
use anyhow::{Result, anyhow};
use serde_json::Value;
use std::env;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};
use tracing::{debug, error, info, warn};

/// Task descriptor handed from the coordinator to the worker
#[derive(Debug, Clone)]
pub struct PublishTask {
    pub contract_id: String,
}

#[derive(Debug, Clone)]
pub struct ArtifactConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub max_retries: u32,
    pub base_retry_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            base_url: env::var("ARTIFACT_STORE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:31415".to_string()),
            auth_token: env::var("ARTIFACT_STORE_TOKEN").ok(),
            max_retries: 4,
            base_retry_delay: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Thin client for a content-addressed blob store reachable over HTTP.
/// Uploading identical bytes twice yields the same reference, so duplicate
/// and concurrent publish attempts are harmless.
pub struct ArtifactClient {
    config: ArtifactConfig,
    client: reqwest::Client,
}

impl ArtifactClient {
    pub fn new() -> Self {
        Self::with_config(ArtifactConfig::default())
    }

    pub fn with_config(config: ArtifactConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Upload bytes, returning the content-addressed reference. Transient
    /// failures are retried with exponential backoff; client errors (4xx,
    /// e.g. missing credentials) are final.
    pub async fn put(&self, bytes: Vec<u8>) -> Result<String> {
        let url = format!("{}/v1/blobs", self.config.base_url);
        let max_retries = self.config.max_retries.max(1);

        for attempt in 1..=max_retries {
            debug!("uploading artifact (attempt {}/{})", attempt, max_retries);

            // body() consumes the buffer, keep the original for retries
            let mut request = self
                .client
                .put(&url)
                .timeout(self.config.request_timeout)
                .body(bytes.clone());
            if let Some(token) = &self.config.auth_token {
                request = request.bearer_auth(token);
            }

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    if attempt < max_retries {
                        self.backoff(attempt, &format!("request failed: {e}")).await;
                        continue;
                    }
                    return Err(anyhow!(
                        "failed to reach artifact store after {max_retries} attempts: {e}"
                    ));
                }
            };

            let status = response.status();
            if status.is_success() {
                let info: Value = match response.json().await {
                    Ok(json) => json,
                    Err(e) => {
                        if attempt < max_retries {
                            self.backoff(attempt, &format!("unreadable response: {e}")).await;
                            continue;
                        }
                        return Err(anyhow!("unreadable artifact store response: {e}"));
                    }
                };

                let reference = info
                    .pointer("/newlyCreated/blobObject/blobId")
                    .or_else(|| info.pointer("/alreadyCertified/blobId"))
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string());

                match reference {
                    Some(reference) => {
                        debug!(%reference, "artifact stored");
                        return Ok(reference);
                    }
                    None => {
                        if attempt < max_retries {
                            self.backoff(attempt, "no reference in response").await;
                            continue;
                        }
                        return Err(anyhow!("artifact store returned no reference"));
                    }
                }
            } else if status.is_client_error() {
                // our request is wrong, retrying the same bytes cannot help
                return Err(anyhow!("artifact store rejected upload: {status}"));
            } else if attempt < max_retries {
                self.backoff(attempt, &format!("server error: {status}")).await;
            } else {
                return Err(anyhow!(
                    "artifact store failed with {status} after {max_retries} attempts"
                ));
            }
        }

        Err(anyhow!("artifact upload failed after all retry attempts"))
    }

    async fn backoff(&self, attempt: u32, cause: &str) {
        // double the delay for each retry
        let delay = self.config.base_retry_delay * 2u32.pow(attempt.saturating_sub(1));
        warn!(
            "artifact upload attempt {attempt} failed ({cause}), retrying in {:?}",
            delay
        );
        sleep(delay).await;
    }
}

impl Default for ArtifactClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Publish the canonical document for one contract.
///
/// Never touches `status`: a failed upload is recorded as
/// `ArtifactStatus::Failed` on the verification sub-record and logged, so
/// the acceptance that triggered the task stays committed either way.
/// Re-invocation is the retry path and is safe, identical bytes map to the
/// same reference in a content-addressed store.
pub async fn publish(
    store: &ContractStore,
    client: &ArtifactClient,
    contract_id: &str,
) -> Result<Contract, EngineError> {
    let Some(contract) = store.get(contract_id)? else {
        return Err(EngineError::NotFound(contract_id.to_string()));
    };
    if contract.status == ContractStatus::Created {
        // content is not final until a counterparty is bound
        return Err(EngineError::Conflict {
            current: contract.status,
        });
    }

    let bytes = canonical::canonical_bytes(&contract)?;
    let base_record = anchor::build_record(&contract)?;

    let (artifact_ref, artifact_status) = match client.put(bytes).await {
        Ok(reference) => {
            info!(contract_id, %reference, "canonical document published");
            (Some(reference), ArtifactStatus::Published)
        }
        Err(e) => {
            error!(contract_id, "canonical document publish failed: {e:#}");
            (None, ArtifactStatus::Failed)
        }
    };

    store
        .update_verification(contract_id, |verification| {
            let record = verification.get_or_insert_with(|| base_record.clone());
            if let Some(reference) = &artifact_ref {
                record.artifact_ref = Some(reference.clone());
            }
            record.artifact_status = artifact_status;
        })?
        .ok_or_else(|| EngineError::NotFound(contract_id.to_string()))
}

/// Background worker draining the publish queue. The coordinator only ever
/// hands over task descriptors; failures stay inside the worker.
pub struct Publisher;

impl Publisher {
    pub fn start(
        store: ContractStore,
        client: ArtifactClient,
        queue_depth: usize,
    ) -> (mpsc::Sender<PublishTask>, JoinHandle<()>) {
        let (queue, mut tasks) = mpsc::channel::<PublishTask>(queue_depth);

        let worker = tokio::spawn(async move {
            while let Some(task) = tasks.recv().await {
                debug!(contract_id = %task.contract_id, "publish task picked up");
                // publish records its own failure state. an Err here means
                // the contract itself was unavailable, which we can only log
                if let Err(e) = publish(&store, &client, &task.contract_id).await {
                    error!(contract_id = %task.contract_id, "publish task failed: {e}");
                }
            }
            info!("publish queue closed, worker exiting");
        });

        (queue, worker)
    }
}
