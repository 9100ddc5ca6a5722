//! Processed webhook event repository port.
//!
//! Card-rail webhooks are delivered at-least-once. The reconciler's
//! upserts are idempotent by construction, but purchase creation and
//! coupon bookkeeping are not, so processed event ids are recorded and
//! duplicates skipped before any mutation.
//!
//! # Race Condition Handling
//!
//! When two deliveries of the same event race:
//! - first to save wins (uniqueness on the event id)
//! - the loser gets `AlreadyExists` and reports the event as already
//!   processed

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::DomainError;

/// Outcome of processing a webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookResult {
    /// Event was processed by this delivery.
    Processed,
    /// Event had already been processed by an earlier delivery.
    AlreadyProcessed,
}

/// Result of saving a processed-event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    Inserted,
    AlreadyExists,
}

/// How an event's processing ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventStatus {
    Success,
    Ignored,
    Failed,
}

/// A record of one processed webhook event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEventRecord {
    /// Provider event id; the dedup key.
    pub event_id: String,
    pub event_type: String,
    pub status: WebhookEventStatus,
    /// Ignore reason or failure message.
    pub detail: Option<String>,
    pub processed_at: DateTime<Utc>,
}

impl WebhookEventRecord {
    pub fn success(event_id: &str, event_type: &str) -> Self {
        Self {
            event_id: event_id.to_string(),
            event_type: event_type.to_string(),
            status: WebhookEventStatus::Success,
            detail: None,
            processed_at: Utc::now(),
        }
    }

    pub fn ignored(event_id: &str, event_type: &str, reason: &str) -> Self {
        Self {
            event_id: event_id.to_string(),
            event_type: event_type.to_string(),
            status: WebhookEventStatus::Ignored,
            detail: Some(reason.to_string()),
            processed_at: Utc::now(),
        }
    }

    pub fn failed(event_id: &str, event_type: &str, error: &str) -> Self {
        Self {
            event_id: event_id.to_string(),
            event_type: event_type.to_string(),
            status: WebhookEventStatus::Failed,
            detail: Some(error.to_string()),
            processed_at: Utc::now(),
        }
    }
}

/// Repository port for processed webhook events.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    /// Find a record by provider event id.
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Save a record. Returns `AlreadyExists` when another delivery won
    /// the race.
    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError>;
}
