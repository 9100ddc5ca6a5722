//! Card-rail webhook event types.
//!
//! The provider posts a polymorphic event envelope; only the fields needed
//! for reconciliation are captured. The envelope's `data.object` is kept as
//! raw JSON and deserialized into a typed payload once the event type is
//! known, so no raw provider shape leaks past this boundary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Card-rail webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CardEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g. "customer.subscription.updated").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created: i64,

    /// Object containing event-specific data.
    pub data: CardEventData,

    /// Whether this is a live mode event (vs test mode).
    #[serde(default)]
    pub livemode: bool,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CardEventData {
    /// The object that triggered the event (polymorphic by event type).
    pub object: serde_json::Value,
}

impl CardEvent {
    /// Parse the event type into a known enum variant.
    pub fn parsed_type(&self) -> CardEventType {
        CardEventType::from_str(&self.event_type)
    }

    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

/// Known card-rail event types that we handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardEventType {
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionDeleted,
    InvoicePaymentSucceeded,
    InvoicePaymentFailed,
    CheckoutSessionCompleted,
    /// Unknown or unhandled event type.
    Unknown,
}

impl CardEventType {
    /// Parse event type from string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "customer.subscription.created" => Self::SubscriptionCreated,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            _ => Self::Unknown,
        }
    }
}

/// Subscription object as delivered in `customer.subscription.*` events.
#[derive(Debug, Clone, Deserialize)]
pub struct CardSubscriptionObject {
    pub id: String,
    pub customer: String,
    pub status: String,
    pub current_period_start: i64,
    pub current_period_end: i64,
    #[serde(default)]
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<i64>,
    pub items: CardSubscriptionItems,
}

impl CardSubscriptionObject {
    /// The price id on the first subscription item, used to resolve the
    /// mirrored product.
    pub fn price_id(&self) -> Option<&str> {
        self.items.data.first().map(|item| item.price.id.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardSubscriptionItems {
    #[serde(default)]
    pub data: Vec<CardSubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardSubscriptionItem {
    pub price: CardPriceRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardPriceRef {
    pub id: String,
}

/// Invoice object as delivered in `invoice.*` events.
#[derive(Debug, Clone, Deserialize)]
pub struct CardInvoiceObject {
    pub id: String,
    pub customer: String,
}

/// Checkout session object as delivered in `checkout.session.completed`.
#[derive(Debug, Clone, Deserialize)]
pub struct CardCheckoutSessionObject {
    pub id: String,
    pub customer: Option<String>,
    /// "payment" for one-time checkouts, "subscription" otherwise.
    pub mode: String,
    pub payment_intent: Option<String>,
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CardCheckoutSessionObject {
    pub fn is_one_time(&self) -> bool {
        self.mode == "payment"
    }
}
