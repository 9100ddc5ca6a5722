//! CryptoWebhookHandler - reconciles crypto-rail payment notifications
//! into the ledger.
//!
//! Signature verification happens before any mutation. Reconciliation is
//! keyed on the payment-intent uuid the core itself generated and
//! persisted at checkout time; an unknown uuid is rejected because there
//! is nothing to reconcile against. Re-delivery of a `paid` notification
//! converges: the intent keeps its original `paid_at` and the
//! subscription/purchase insert is skipped when the synthetic provider id
//! already exists.

use std::sync::Arc;

use crate::domain::billing::{
    CryptoSigner, CryptoWebhook, PaymentIntent, PaymentKind, Purchase, RenewalReminder,
    Subscription, WebhookError,
};
use crate::domain::foundation::Timestamp;
use crate::ports::{
    CouponRepository, PaymentIntentRepository, ProductRepository, PurchaseRepository,
    ReminderRepository, SubscriptionRepository,
};

use super::renewal::CompleteRenewalHandler;

/// Handler for the crypto rail's single webhook shape.
pub struct CryptoWebhookHandler {
    signer: CryptoSigner,
    intents: Arc<dyn PaymentIntentRepository>,
    products: Arc<dyn ProductRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    purchases: Arc<dyn PurchaseRepository>,
    coupons: Arc<dyn CouponRepository>,
    reminders: Arc<dyn ReminderRepository>,
    renewal: Arc<CompleteRenewalHandler>,
}

impl CryptoWebhookHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        signer: CryptoSigner,
        intents: Arc<dyn PaymentIntentRepository>,
        products: Arc<dyn ProductRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        purchases: Arc<dyn PurchaseRepository>,
        coupons: Arc<dyn CouponRepository>,
        reminders: Arc<dyn ReminderRepository>,
        renewal: Arc<CompleteRenewalHandler>,
    ) -> Self {
        Self {
            signer,
            intents,
            products,
            subscriptions,
            purchases,
            coupons,
            reminders,
            renewal,
        }
    }

    /// Verifies and applies one webhook delivery.
    pub async fn handle(&self, payload: serde_json::Value) -> Result<(), WebhookError> {
        // Authenticity first; nothing is mutated on a bad signature.
        if !self.signer.verify_embedded(&payload) {
            tracing::warn!("invalid crypto webhook signature");
            return Err(WebhookError::InvalidSignature);
        }

        let webhook: CryptoWebhook = serde_json::from_value(payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let Some(mut intent) = self.intents.find_by_provider_uuid(&webhook.uuid).await? else {
            tracing::warn!(uuid = %webhook.uuid, "crypto webhook for unknown payment");
            return Err(WebhookError::PaymentNotFound);
        };

        let now = Timestamp::now();
        intent.apply_status(webhook.payment_status, now);
        if webhook.is_paid() {
            intent.record_settlement(
                webhook.payer_currency.clone().unwrap_or_default(),
                webhook.payer_amount.clone().unwrap_or_default(),
                webhook.network.clone().unwrap_or_default(),
            );
        }
        self.intents.update(&intent).await?;

        tracing::info!(
            uuid = %webhook.uuid,
            order_id = %webhook.order_id,
            status = ?webhook.payment_status,
            "crypto payment status updated"
        );

        if webhook.is_paid() {
            self.apply_paid(&intent, now).await?;
        }

        Ok(())
    }

    async fn apply_paid(&self, intent: &PaymentIntent, now: Timestamp) -> Result<(), WebhookError> {
        match intent.kind {
            PaymentKind::SubscriptionRenewal => match intent.related_subscription {
                Some(subscription_id) => {
                    self.renewal
                        .handle(&intent.provider_uuid, subscription_id)
                        .await
                        .map_err(|e| WebhookError::Storage(e.to_string()))?;
                }
                None => {
                    // A renewal intent without its link cannot be applied;
                    // retrying will not grow the link back.
                    tracing::error!(
                        uuid = %intent.provider_uuid,
                        "renewal payment has no linked subscription"
                    );
                }
            },
            PaymentKind::OneTime => {
                self.record_purchase(intent, now).await?;
            }
            PaymentKind::Subscription | PaymentKind::PrepaidSubscription => {
                self.establish_subscription(intent, now).await?;
            }
        }

        // Coupon bookkeeping is best-effort in every branch; it must never
        // block payment recording.
        if let Some(code) = &intent.coupon_code {
            self.increment_coupon(code).await;
        }

        Ok(())
    }

    async fn record_purchase(
        &self,
        intent: &PaymentIntent,
        now: Timestamp,
    ) -> Result<(), WebhookError> {
        let reference = format!("cryptomus_{}", intent.provider_uuid);
        if self
            .purchases
            .find_by_provider_payment_id(&reference)
            .await?
            .is_some()
        {
            tracing::info!(reference = %reference, "purchase already recorded");
            return Ok(());
        }

        let purchase = Purchase::completed(
            intent.user_id,
            intent.product_id,
            reference,
            intent.amount,
            &intent.currency,
            now,
        );
        self.purchases.save(&purchase).await?;
        Ok(())
    }

    async fn establish_subscription(
        &self,
        intent: &PaymentIntent,
        now: Timestamp,
    ) -> Result<(), WebhookError> {
        let provider_id = format!("cryptomus_{}", intent.provider_uuid);
        if self
            .subscriptions
            .find_by_provider_id(&provider_id)
            .await?
            .is_some()
        {
            tracing::info!(provider_id = %provider_id, "subscription already established");
            return Ok(());
        }

        let Some(product) = self.products.find_by_id(&intent.product_id).await? else {
            // Data integrity problem: the intent references a product that
            // has vanished. Surface a retryable failure for operators.
            tracing::error!(
                product = %intent.product_id,
                uuid = %intent.provider_uuid,
                "paid subscription references missing product"
            );
            return Err(WebhookError::Storage("product not found".to_string()));
        };

        let period_end = now.add_days(product.period_days());
        let subscription = Subscription::from_crypto_payment(
            intent.user_id,
            product.id,
            &intent.provider_uuid,
            now,
            period_end,
        );
        self.subscriptions.save(&subscription).await?;

        // Prepaid monthly subscriptions need a nudge before the period
        // lapses; the reminder is best-effort.
        if intent.kind == PaymentKind::PrepaidSubscription && product.is_monthly_subscription() {
            let reminder =
                RenewalReminder::before_renewal(intent.user_id, product.id, period_end);
            if let Err(err) = self.reminders.save(&reminder).await {
                tracing::warn!(error = %err, "failed to create renewal reminder");
            }
        }

        Ok(())
    }

    async fn increment_coupon(&self, code: &str) {
        let lookup = self.coupons.find_by_code(&code.to_uppercase()).await;
        match lookup {
            Ok(Some(coupon)) => {
                if let Err(err) = self.coupons.increment_usage(&coupon.id).await {
                    tracing::warn!(coupon = %code, error = %err, "failed to increment coupon usage");
                }
            }
            Ok(None) => {
                tracing::warn!(coupon = %code, "coupon recorded on payment no longer exists");
            }
            Err(err) => {
                tracing::warn!(coupon = %code, error = %err, "coupon lookup failed");
            }
        }
    }
}
