//! Billing queries: the overview page data and crypto payment polling.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Product, Subscription};
use crate::domain::foundation::UserId;
use crate::ports::{CryptoPayment, CryptoRail, ProductRepository, SubscriptionRepository};

/// Data backing the billing page.
#[derive(Debug, Clone)]
pub struct BillingOverview {
    pub products: Vec<Product>,
    pub current_subscription: Option<Subscription>,
}

/// Handler assembling the billing overview for a user.
pub struct GetBillingOverviewHandler {
    products: Arc<dyn ProductRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
}

impl GetBillingOverviewHandler {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
    ) -> Self {
        Self {
            products,
            subscriptions,
        }
    }

    pub async fn handle(&self, user_id: UserId) -> Result<BillingOverview, BillingError> {
        let products = self.products.find_active().await?;
        let current_subscription = self.subscriptions.find_current_for_user(&user_id).await?;
        Ok(BillingOverview {
            products,
            current_subscription,
        })
    }
}

/// Handler polling a crypto payment's provider-side status.
pub struct GetCryptoPaymentHandler {
    crypto: Arc<dyn CryptoRail>,
}

impl GetCryptoPaymentHandler {
    pub fn new(crypto: Arc<dyn CryptoRail>) -> Self {
        Self { crypto }
    }

    pub async fn handle(&self, uuid: &str) -> Result<CryptoPayment, BillingError> {
        Ok(self.crypto.payment_status(uuid).await?)
    }
}
