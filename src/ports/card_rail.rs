//! Card rail port - the capability interface for the card payment
//! processor.
//!
//! One orchestrator drives both rails through their capability traits, so
//! coupon, pricing, and persistence logic exists exactly once. All
//! operations are safe to retry; the mirror-creation calls verify that an
//! existing mirror still resolves upstream before reusing it, and recreate
//! it otherwise.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::billing::{BillingError, Coupon, Product};
use crate::domain::foundation::{ProductId, UserId};

/// Checkout session mode on the card rail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    /// Recurring billing.
    Subscription,
    /// One-time payment.
    Payment,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Subscription => "subscription",
            CheckoutMode::Payment => "payment",
        }
    }
}

/// Metadata attached to a checkout session and echoed back on the webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutMetadata {
    pub user_id: UserId,
    pub product_id: ProductId,
    /// "one_time" or "subscription".
    pub price_type: String,
    pub coupon_code: Option<String>,
}

/// Request to create a card-rail checkout session.
#[derive(Debug, Clone)]
pub struct CreateCardCheckout {
    pub customer_id: String,
    pub price_id: String,
    pub mode: CheckoutMode,
    /// Mirrored coupon id to attach as a session-level discount. When set,
    /// the session disables generic promotion codes.
    pub discount_coupon_id: Option<String>,
    pub metadata: CheckoutMetadata,
    pub success_url: String,
    pub cancel_url: String,
}

/// A created checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardCheckoutSession {
    pub id: String,
    pub url: String,
}

/// Card-rail product/price mirror ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductMirror {
    pub product_id: String,
    pub price_id: String,
}

/// Proration behavior when changing a subscription's item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProrationPolicy {
    CreateProrations,
    None,
    AlwaysInvoice,
}

impl ProrationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProrationPolicy::CreateProrations => "create_prorations",
            ProrationPolicy::None => "none",
            ProrationPolicy::AlwaysInvoice => "always_invoice",
        }
    }
}

/// Errors from rail operations.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct RailError {
    pub code: RailErrorCode,
    /// Upstream message, preserved for operator diagnosis.
    pub message: String,
    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl RailError {
    pub fn new(code: RailErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: code.is_retryable(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RailErrorCode::Network, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(RailErrorCode::Provider, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(RailErrorCode::NotFound, format!("{} not found", resource))
    }
}

/// Rail error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RailErrorCode {
    /// Network connectivity issue.
    Network,
    /// API authentication failed.
    Authentication,
    /// Resource not found upstream.
    NotFound,
    /// Provider rejected or failed the operation.
    Provider,
}

impl RailErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RailErrorCode::Network)
    }
}

impl std::fmt::Display for RailErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RailErrorCode::Network => "network_error",
            RailErrorCode::Authentication => "authentication_error",
            RailErrorCode::NotFound => "not_found",
            RailErrorCode::Provider => "provider_error",
        };
        write!(f, "{}", s)
    }
}

impl From<RailError> for BillingError {
    fn from(err: RailError) -> Self {
        match err.code {
            RailErrorCode::NotFound => BillingError::NotFound("Provider resource"),
            _ => BillingError::Provider(err.message),
        }
    }
}

/// Port for the card payment processor.
#[async_trait]
pub trait CardRail: Send + Sync {
    /// Create a customer, returning the provider's customer id.
    async fn create_customer(
        &self,
        user_id: &UserId,
        email: &str,
        name: Option<&str>,
    ) -> Result<String, RailError>;

    /// Create a checkout session for the user to complete payment on the
    /// provider's site.
    async fn create_checkout_session(
        &self,
        request: CreateCardCheckout,
    ) -> Result<CardCheckoutSession, RailError>;

    /// Create a billing portal session, returning its URL.
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<String, RailError>;

    /// Flag a subscription to cancel when the current period ends.
    async fn cancel_at_period_end(&self, subscription_id: &str) -> Result<(), RailError>;

    /// Clear the cancel-at-period-end flag before the period lapses.
    async fn reactivate(&self, subscription_id: &str) -> Result<(), RailError>;

    /// Swap the subscription's item to a different price.
    async fn change_subscription_item(
        &self,
        subscription_id: &str,
        new_price_id: &str,
        proration: ProrationPolicy,
    ) -> Result<(), RailError>;

    /// Idempotently ensure the product has provider-side product/price
    /// mirrors: verify existing mirror ids still resolve upstream, recreate
    /// them when they dangle.
    async fn ensure_product_mirror(&self, product: &Product) -> Result<ProductMirror, RailError>;

    /// Idempotently ensure the coupon has a provider-side mirror, same
    /// verify-or-recreate contract as products.
    async fn ensure_coupon_mirror(&self, coupon: &Coupon) -> Result<String, RailError>;
}
