//! User directory port.
//!
//! The user collection is owned by the content store. Billing needs four
//! things from it: resolve a user, resolve by card-rail customer id, write
//! back a lazily created customer id, and mirror subscription state onto
//! the user record for cheap access checks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::billing::SubscriptionStatus;
use crate::domain::foundation::{DomainError, ProductId, UserId};

/// The slice of a user record billing cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingUser {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    /// Card-rail customer mirror, created lazily at first card checkout.
    pub card_customer_id: Option<String>,
    /// Mirrored subscription status for cheap access checks.
    pub subscription_status: Option<SubscriptionStatus>,
    /// Mirrored current product.
    pub current_product: Option<ProductId>,
}

impl BillingUser {
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            name: None,
            card_customer_id: None,
            subscription_status: None,
            current_product: None,
        }
    }
}

/// Port onto the externally-owned user collection.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve a user by id. Returns `None` if absent.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<BillingUser>, DomainError>;

    /// Resolve a user by their card-rail customer id.
    async fn find_by_card_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<BillingUser>, DomainError>;

    /// Record a lazily created card-rail customer id on the user.
    async fn set_card_customer_id(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), DomainError>;

    /// Mirror the user's subscription status and current product.
    async fn mirror_subscription(
        &self,
        user_id: &UserId,
        status: Option<SubscriptionStatus>,
        current_product: Option<ProductId>,
    ) -> Result<(), DomainError>;

    /// Mirror only the subscription status, leaving the current product
    /// untouched (payment-failed events know the status but not the
    /// product).
    async fn set_subscription_status(
        &self,
        user_id: &UserId,
        status: SubscriptionStatus,
    ) -> Result<(), DomainError>;
}
