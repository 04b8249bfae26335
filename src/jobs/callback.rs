use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::CallbackError;
use crate::models::{JobId, PropertyId};

pub const STAGE_SCRAPING: &str = "scraping";
pub const STAGE_ERROR: &str = "error";

/// Progress checkpoint as posted to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: String,
    pub message: String,
    /// 0..=100
    pub progress: u8,
}

impl ProgressUpdate {
    pub fn new(stage: &str, message: impl Into<String>, progress: u8) -> Self {
        Self {
            stage: stage.to_string(),
            message: message.into(),
            progress: progress.min(100),
        }
    }
}

/// Body of a callback POST
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallbackPayload {
    Progress {
        job_id: JobId,
        progress: ProgressUpdate,
    },
    Terminal {
        job_id: JobId,
        property_id: Option<PropertyId>,
        task_id: Option<i64>,
    },
}

/// Delivers callback payloads to the caller's URL
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post(&self, url: &str, payload: &CallbackPayload) -> Result<(), CallbackError>;
}

/// Posts payloads as JSON with reqwest
pub struct HttpNotifier {
    client: Client,
}

impl HttpNotifier {
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self, CallbackError> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn post(&self, url: &str, payload: &CallbackPayload) -> Result<(), CallbackError> {
        let response = self.client.post(url).json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CallbackError::Rejected(status));
        }
        Ok(())
    }
}

/// What happened to one best-effort delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// The job has no callback URL
    Skipped,
    Failed(String),
}

/// Post `payload` if the job has a callback URL.
///
/// Never fails: errors come back as `DeliveryOutcome::Failed` for the caller
/// to log, so they cannot change the job's own state.
pub async fn deliver(
    notifier: &dyn Notifier,
    callback_url: Option<&str>,
    payload: &CallbackPayload,
) -> DeliveryOutcome {
    let Some(url) = callback_url else {
        return DeliveryOutcome::Skipped;
    };

    match notifier.post(url, payload).await {
        Ok(()) => {
            debug!(callback_url = url, "Callback delivered: {:?}", payload);
            DeliveryOutcome::Delivered
        }
        Err(e) => DeliveryOutcome::Failed(format!("{url}: {e}")),
    }
}
