//! Wire types for the card rail's REST API.
//!
//! Only the fields the adapter reads are captured; everything else in the
//! provider's responses is ignored.

use serde::Deserialize;

/// Customer resource.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
}

/// Checkout session resource.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    /// Absent once the session is completed or expired.
    pub url: Option<String>,
}

/// Billing portal session resource.
#[derive(Debug, Clone, Deserialize)]
pub struct StripePortalSession {
    pub url: String,
}

/// Product resource.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeProduct {
    pub id: String,
}

/// Price resource.
#[derive(Debug, Clone, Deserialize)]
pub struct StripePrice {
    pub id: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub deleted: bool,
}

/// Coupon resource.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCoupon {
    pub id: String,
    #[serde(default = "default_true")]
    pub valid: bool,
    #[serde(default)]
    pub deleted: bool,
}

/// Subscription resource (for item lookup before a plan change).
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub items: StripeSubscriptionItems,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItems {
    #[serde(default)]
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItem {
    pub id: String,
}

fn default_true() -> bool {
    true
}
