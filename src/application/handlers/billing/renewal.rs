//! Renewal handlers for prepaid crypto subscriptions.
//!
//! `RenewSubscriptionHandler` creates the next-period payment;
//! `CompleteRenewalHandler` applies the confirmed renewal to the ledger;
//! `GetExpiringSubscriptionsHandler` lists crypto-origin subscriptions
//! approaching their period end.

use std::sync::Arc;

use crate::domain::billing::{
    renewal_order_id, BillingError, PaymentIntent, PaymentKind, Product, RenewalReminder,
    Subscription, SubscriptionOrigin,
};
use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use crate::ports::{
    CreateCryptoPayment, CryptoRail, PaymentIntentRepository, ProductRepository,
    ReminderRepository, SubscriptionRepository,
};

use super::checkout::RedirectUrls;

/// Result of starting a renewal payment.
#[derive(Debug, Clone)]
pub struct RenewalPayment {
    pub payment_id: String,
    pub url: String,
    pub order_id: String,
}

/// Handler creating a fresh crypto payment for the next period.
pub struct RenewSubscriptionHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    products: Arc<dyn ProductRepository>,
    intents: Arc<dyn PaymentIntentRepository>,
    crypto: Arc<dyn CryptoRail>,
    urls: RedirectUrls,
}

impl RenewSubscriptionHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        products: Arc<dyn ProductRepository>,
        intents: Arc<dyn PaymentIntentRepository>,
        crypto: Arc<dyn CryptoRail>,
        urls: RedirectUrls,
    ) -> Self {
        Self {
            subscriptions,
            products,
            intents,
            crypto,
            urls,
        }
    }

    /// Creates a renewal payment for the next period at the product's full
    /// price, linked back to the subscription it extends.
    pub async fn handle(
        &self,
        subscription_id: SubscriptionId,
        user_id: UserId,
    ) -> Result<RenewalPayment, BillingError> {
        let subscription = self
            .subscriptions
            .find_by_id_for_user(&subscription_id, &user_id)
            .await?
            .ok_or(BillingError::NotFound("Subscription"))?;

        let product = self
            .products
            .find_by_id(&subscription.product_id)
            .await?
            .ok_or(BillingError::NotFound("Product"))?;

        let order_id = renewal_order_id(subscription.id, Timestamp::now());

        let payment = self
            .crypto
            .create_payment(CreateCryptoPayment {
                amount: product.price,
                currency: product.currency.clone(),
                order_id: order_id.clone(),
                return_url: Some(self.urls.renewal_cancel()),
                success_url: Some(self.urls.renewal_success()),
                callback_url: Some(self.urls.crypto_callback()),
            })
            .await?;

        let intent = PaymentIntent::pending(
            user_id,
            product.id,
            &payment.uuid,
            &order_id,
            product.price,
            &product.currency,
            PaymentKind::SubscriptionRenewal,
            &payment.url,
        )
        .for_subscription(subscription.id);
        self.intents.save(&intent).await?;

        tracing::info!(
            subscription = %subscription.id,
            payment_uuid = %payment.uuid,
            "created renewal payment"
        );

        Ok(RenewalPayment {
            payment_id: payment.uuid,
            url: payment.url,
            order_id,
        })
    }
}

/// Handler applying a confirmed renewal payment to the subscription.
pub struct CompleteRenewalHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    products: Arc<dyn ProductRepository>,
    reminders: Arc<dyn ReminderRepository>,
}

impl CompleteRenewalHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        products: Arc<dyn ProductRepository>,
        reminders: Arc<dyn ReminderRepository>,
    ) -> Self {
        Self {
            subscriptions,
            products,
            reminders,
        }
    }

    /// Extends the subscription by one interval from its previous period
    /// end, reschedules the next reminder for monthly products, and marks
    /// any still-pending reminders for this user+product renewed.
    ///
    /// Returns the new period end.
    pub async fn handle(
        &self,
        payment_uuid: &str,
        subscription_id: SubscriptionId,
    ) -> Result<Timestamp, BillingError> {
        let mut subscription = self
            .subscriptions
            .find_by_id(&subscription_id)
            .await?
            .ok_or(BillingError::NotFound("Subscription"))?;

        let product = self
            .products
            .find_by_id(&subscription.product_id)
            .await?
            .ok_or(BillingError::NotFound("Product"))?;

        subscription.renew(product.period_days());
        self.subscriptions.update(&subscription).await?;

        let new_period_end = subscription.current_period_end;

        tracing::info!(
            subscription = %subscription.id,
            payment_uuid = %payment_uuid,
            new_period_end = %new_period_end,
            "subscription renewed"
        );

        if product.is_monthly_subscription() {
            self.schedule_next_reminder(&subscription, &product, new_period_end)
                .await;
        }

        // Idempotent cleanup: there should be at most one pending reminder,
        // but tolerate more.
        let pending = self
            .reminders
            .find_pending_for_user_product(&subscription.user_id, &product.id)
            .await?;
        for mut reminder in pending {
            reminder.mark_renewed();
            if let Err(err) = self.reminders.update(&reminder).await {
                tracing::warn!(reminder = %reminder.id, error = %err, "failed to retire reminder");
            }
        }

        Ok(new_period_end)
    }

    /// Best-effort: a missing reminder must never fail a recorded payment.
    async fn schedule_next_reminder(
        &self,
        subscription: &Subscription,
        product: &Product,
        renews_at: Timestamp,
    ) {
        let reminder =
            RenewalReminder::before_renewal(subscription.user_id, product.id, renews_at);
        if let Err(err) = self.reminders.save(&reminder).await {
            tracing::warn!(
                subscription = %subscription.id,
                error = %err,
                "failed to schedule renewal reminder"
            );
        }
    }
}

/// An expiring subscription with its product details.
#[derive(Debug, Clone)]
pub struct ExpiringSubscription {
    pub subscription: Subscription,
    pub product: Product,
}

/// Handler listing a user's crypto-origin subscriptions expiring within a
/// window.
pub struct GetExpiringSubscriptionsHandler {
    subscriptions: Arc<dyn SubscriptionRepository>,
    products: Arc<dyn ProductRepository>,
}

impl GetExpiringSubscriptionsHandler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepository>,
        products: Arc<dyn ProductRepository>,
    ) -> Self {
        Self {
            subscriptions,
            products,
        }
    }

    /// Active subscriptions for the user ending within `days_ahead` days,
    /// filtered to those renewable on the crypto rail (crypto-origin rows
    /// and promotional rows granted through a crypto checkout).
    pub async fn handle(
        &self,
        user_id: UserId,
        days_ahead: i64,
    ) -> Result<Vec<ExpiringSubscription>, BillingError> {
        let cutoff = Timestamp::now().add_days(days_ahead);
        let candidates = self
            .subscriptions
            .find_active_for_user_ending_before(&user_id, cutoff)
            .await?;

        let mut expiring = Vec::new();
        for subscription in candidates {
            let crypto_renewable = subscription.origin == SubscriptionOrigin::Crypto
                || subscription
                    .provider_subscription_id
                    .starts_with("free_crypto_");
            if !crypto_renewable {
                continue;
            }
            match self.products.find_by_id(&subscription.product_id).await? {
                Some(product) => expiring.push(ExpiringSubscription {
                    subscription,
                    product,
                }),
                None => {
                    tracing::warn!(
                        subscription = %subscription.id,
                        "expiring subscription references missing product"
                    );
                }
            }
        }

        Ok(expiring)
    }
}
