//! Background certificate delivery.
//!
//! Each delivery runs on its own tokio task after the HTTP response has been
//! produced. Its lifecycle (`started` then `completed` or `failed`) is
//! recorded in a short-lived cache so it can be inspected or awaited later.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::mailer::{DeliveryOutcome, Mailer};

const RECORD_TTL: Duration = Duration::from_secs(60 * 60);
const MAX_RECORDS: u64 = 10_000;

/// Lifecycle state of one delivery.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DeliveryStatus {
    Started {
        recipient: String,
        #[serde(rename = "startedAt")]
        started_at: DateTime<Utc>,
    },
    Completed { outcome: DeliveryOutcome },
    Failed { outcome: DeliveryOutcome },
}

impl DeliveryStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Started { .. })
    }

    pub fn outcome(&self) -> Option<&DeliveryOutcome> {
        match self {
            Self::Started { .. } => None,
            Self::Completed { outcome } | Self::Failed { outcome } => Some(outcome),
        }
    }
}

/// Handle to a dispatched delivery.
pub struct DeliveryHandle {
    pub id: Uuid,
    task: JoinHandle<DeliveryOutcome>,
}

impl DeliveryHandle {
    /// Wait for the delivery to finish. `None` if the task panicked or was aborted.
    pub async fn wait(self) -> Option<DeliveryOutcome> {
        match self.task.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                log::error!("Delivery task {} did not complete: {}", self.id, e);
                None
            }
        }
    }
}

/// Dispatches deliveries and remembers their state.
#[derive(Clone)]
pub struct DeliveryTracker {
    records: Cache<Uuid, watch::Receiver<DeliveryStatus>>,
}

impl Default for DeliveryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryTracker {
    pub fn new() -> Self {
        Self {
            records: Cache::builder()
                .time_to_live(RECORD_TTL)
                .max_capacity(MAX_RECORDS)
                .build(),
        }
    }

    /// Start emailing `pdf` and `preview` to `recipient` in the background.
    pub async fn dispatch(
        &self,
        mailer: Arc<Mailer>,
        recipient: String,
        pdf: Vec<u8>,
        preview: Vec<u8>,
    ) -> DeliveryHandle {
        let id = Uuid::new_v4();
        let (sender, receiver) = watch::channel(DeliveryStatus::Started {
            recipient: recipient.clone(),
            started_at: Utc::now(),
        });
        self.records.insert(id, receiver).await;
        log::info!("Delivery {} started for {}", id, recipient);

        let task = tokio::spawn(async move {
            let send_to = recipient.clone();
            let send = tokio::spawn(async move {
                mailer.send_certificate(&send_to, &pdf, &preview).await
            });
            let outcome = match send.await {
                Ok(outcome) => outcome,
                Err(e) => DeliveryOutcome::failed(
                    &recipient,
                    format!("delivery task did not complete: {e}"),
                ),
            };
            let status = if outcome.success {
                log::info!("Delivery {}: certificate email sent to {}", id, recipient);
                DeliveryStatus::Completed {
                    outcome: outcome.clone(),
                }
            } else {
                log::error!(
                    "Delivery {}: email sending failed: {}",
                    id,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
                DeliveryStatus::Failed {
                    outcome: outcome.clone(),
                }
            };
            sender.send_replace(status);
            outcome
        });

        DeliveryHandle { id, task }
    }

    /// Current state of delivery `id`, if still remembered.
    pub async fn status(&self, id: &Uuid) -> Option<DeliveryStatus> {
        let receiver = self.records.get(id).await?;
        let status = receiver.borrow().clone();
        Some(status)
    }

    /// Wait until delivery `id` has finished and return its final state.
    ///
    /// Returns the last known state if the task ended without reporting.
    pub async fn wait(&self, id: &Uuid) -> Option<DeliveryStatus> {
        let mut receiver = self.records.get(id).await?;
        let finished = receiver
            .wait_for(DeliveryStatus::is_finished)
            .await
            .map(|status| (*status).clone());
        let status = match finished {
            Ok(status) => status,
            Err(_) => receiver.borrow().clone(),
        };
        Some(status)
    }
}
