//! CardWebhookHandler - reconciles card-rail events into the ledger.
//!
//! Signature verification happens at the HTTP edge (the verifier parses the
//! event envelope); this handler applies state transitions exactly once.
//!
//! Two layers provide idempotence: processed event ids are recorded and
//! duplicate deliveries skipped up front, and the subscription upsert is
//! keyed on the provider subscription id so a replayed `created` event
//! converges to an update either way.
//!
//! Events referencing unknown customers, products, or metadata are logged
//! and dropped as ignored (the provider must not retry them forever); only
//! store failures surface as errors.

use std::sync::Arc;

use crate::domain::billing::{
    CardCheckoutSessionObject, CardEvent, CardEventType, CardInvoiceObject,
    CardSubscriptionObject, Purchase, Subscription, SubscriptionStatus, WebhookError,
};
use crate::domain::foundation::{ProductId, Timestamp};
use crate::ports::{
    CouponRepository, ProductRepository, PurchaseRepository, SaveResult, SubscriptionRepository,
    UserDirectory, WebhookEventRecord, WebhookEventRepository, WebhookResult,
};

/// Handler for card-rail webhook events.
pub struct CardWebhookHandler {
    users: Arc<dyn UserDirectory>,
    products: Arc<dyn ProductRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    purchases: Arc<dyn PurchaseRepository>,
    coupons: Arc<dyn CouponRepository>,
    events: Arc<dyn WebhookEventRepository>,
}

impl CardWebhookHandler {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        products: Arc<dyn ProductRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        purchases: Arc<dyn PurchaseRepository>,
        coupons: Arc<dyn CouponRepository>,
        events: Arc<dyn WebhookEventRepository>,
    ) -> Self {
        Self {
            users,
            products,
            subscriptions,
            purchases,
            coupons,
            events,
        }
    }

    /// Processes one verified event exactly once.
    pub async fn handle(&self, event: CardEvent) -> Result<WebhookResult, WebhookError> {
        // 1. Skip events already processed by an earlier delivery.
        if self.events.find_by_event_id(&event.id).await?.is_some() {
            tracing::info!(event_id = %event.id, "card event already processed");
            return Ok(WebhookResult::AlreadyProcessed);
        }

        // 2. Apply the event.
        let result = self.dispatch(&event).await;

        // 3. Record the outcome.
        let record = match &result {
            Ok(()) => WebhookEventRecord::success(&event.id, &event.event_type),
            Err(WebhookError::Ignored(reason)) => {
                WebhookEventRecord::ignored(&event.id, &event.event_type, reason)
            }
            Err(e) => WebhookEventRecord::failed(&event.id, &event.event_type, &e.to_string()),
        };

        // 4. First save wins the duplicate-delivery race.
        match self.events.save(record).await? {
            SaveResult::Inserted => match result {
                Ok(()) => Ok(WebhookResult::Processed),
                // Ignored events are acknowledged as processed.
                Err(WebhookError::Ignored(reason)) => {
                    tracing::info!(event_id = %event.id, reason = %reason, "card event ignored");
                    Ok(WebhookResult::Processed)
                }
                Err(e) => Err(e),
            },
            SaveResult::AlreadyExists => Ok(WebhookResult::AlreadyProcessed),
        }
    }

    async fn dispatch(&self, event: &CardEvent) -> Result<(), WebhookError> {
        match event.parsed_type() {
            CardEventType::SubscriptionCreated | CardEventType::SubscriptionUpdated => {
                self.apply_subscription_change(event).await
            }
            CardEventType::SubscriptionDeleted => self.apply_subscription_deleted(event).await,
            CardEventType::InvoicePaymentSucceeded => {
                // Informational; subscription state is driven by the
                // subscription events.
                tracing::info!(event_id = %event.id, "invoice paid");
                Ok(())
            }
            CardEventType::InvoicePaymentFailed => self.apply_payment_failed(event).await,
            CardEventType::CheckoutSessionCompleted => self.apply_checkout_completed(event).await,
            CardEventType::Unknown => Err(WebhookError::Ignored(format!(
                "unhandled event type: {}",
                event.event_type
            ))),
        }
    }

    /// Upsert keyed on the provider subscription id, then mirror status and
    /// product onto the user record.
    async fn apply_subscription_change(&self, event: &CardEvent) -> Result<(), WebhookError> {
        let object: CardSubscriptionObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let Some(user) = self.users.find_by_card_customer_id(&object.customer).await? else {
            return Err(WebhookError::Ignored(format!(
                "no user for customer {}",
                object.customer
            )));
        };

        let Some(status) = SubscriptionStatus::parse(&object.status) else {
            return Err(WebhookError::Ignored(format!(
                "unhandled subscription status: {}",
                object.status
            )));
        };

        let period_start = Timestamp::from_unix_secs(object.current_period_start);
        let period_end = Timestamp::from_unix_secs(object.current_period_end);
        let canceled_at = object.canceled_at.map(Timestamp::from_unix_secs);

        let product_id = match self.subscriptions.find_by_provider_id(&object.id).await? {
            Some(mut existing) => {
                existing.apply_card_update(
                    status,
                    period_start,
                    period_end,
                    object.cancel_at_period_end,
                    canceled_at,
                );
                self.subscriptions.update(&existing).await?;
                existing.product_id
            }
            None => {
                let Some(price_id) = object.price_id() else {
                    return Err(WebhookError::Ignored("subscription has no price".into()));
                };
                let Some(product) = self.products.find_by_card_price_id(price_id).await? else {
                    return Err(WebhookError::Ignored(format!(
                        "no product for price {}",
                        price_id
                    )));
                };

                let subscription = Subscription::from_card_rail(
                    user.id,
                    product.id,
                    &object.id,
                    &object.customer,
                    status,
                    period_start,
                    period_end,
                    object.cancel_at_period_end,
                    canceled_at,
                );
                self.subscriptions.save(&subscription).await?;
                product.id
            }
        };

        self.users
            .mirror_subscription(&user.id, Some(status), Some(product_id))
            .await?;

        tracing::info!(
            subscription = %object.id,
            status = %object.status,
            "card subscription upserted"
        );
        Ok(())
    }

    async fn apply_subscription_deleted(&self, event: &CardEvent) -> Result<(), WebhookError> {
        let object: CardSubscriptionObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let now = Timestamp::now();

        if let Some(mut subscription) =
            self.subscriptions.find_by_provider_id(&object.id).await?
        {
            subscription.cancel(now);
            self.subscriptions.update(&subscription).await?;
        } else {
            tracing::warn!(subscription = %object.id, "deleted subscription not in ledger");
        }

        if let Some(user) = self.users.find_by_card_customer_id(&object.customer).await? {
            self.users
                .mirror_subscription(&user.id, Some(SubscriptionStatus::Canceled), None)
                .await?;
        }

        Ok(())
    }

    async fn apply_payment_failed(&self, event: &CardEvent) -> Result<(), WebhookError> {
        let invoice: CardInvoiceObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let Some(user) = self.users.find_by_card_customer_id(&invoice.customer).await? else {
            return Err(WebhookError::Ignored(format!(
                "no user for customer {}",
                invoice.customer
            )));
        };

        self.users
            .set_subscription_status(&user.id, SubscriptionStatus::PastDue)
            .await?;

        tracing::warn!(invoice = %invoice.id, user = %user.id, "invoice payment failed");
        Ok(())
    }

    /// One-time checkouts book a purchase here. Subscription-mode sessions
    /// are fully handled by the subscription events; booking them here too
    /// would double-count.
    async fn apply_checkout_completed(&self, event: &CardEvent) -> Result<(), WebhookError> {
        let session: CardCheckoutSessionObject = event
            .deserialize_object()
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        if !session.is_one_time() {
            return Err(WebhookError::Ignored(
                "subscription checkout handled by subscription events".into(),
            ));
        }

        let Some(customer) = session.customer.as_deref() else {
            return Err(WebhookError::Ignored("session has no customer".into()));
        };
        let Some(user) = self.users.find_by_card_customer_id(customer).await? else {
            return Err(WebhookError::Ignored(format!(
                "no user for customer {}",
                customer
            )));
        };

        let Some(product_id) = session
            .metadata
            .get("product_id")
            .and_then(|s| s.parse::<ProductId>().ok())
        else {
            return Err(WebhookError::Ignored("session metadata missing product".into()));
        };
        let Some(product) = self.products.find_by_id(&product_id).await? else {
            return Err(WebhookError::Ignored(format!(
                "no product {} for completed session",
                product_id
            )));
        };

        let reference = session
            .payment_intent
            .clone()
            .unwrap_or_else(|| session.id.clone());

        if self
            .purchases
            .find_by_provider_payment_id(&reference)
            .await?
            .is_none()
        {
            let purchase = Purchase::completed(
                user.id,
                product.id,
                &reference,
                session.amount_total.unwrap_or(product.price),
                session.currency.as_deref().unwrap_or(&product.currency),
                Timestamp::now(),
            );
            self.purchases.save(&purchase).await?;
            tracing::info!(reference = %reference, "purchase recorded");
        }

        if let Some(code) = session.metadata.get("coupon_code") {
            self.increment_coupon(code).await;
        }

        Ok(())
    }

    async fn increment_coupon(&self, code: &str) {
        match self.coupons.find_by_code(&code.to_uppercase()).await {
            Ok(Some(coupon)) => {
                if let Err(err) = self.coupons.increment_usage(&coupon.id).await {
                    tracing::warn!(coupon = %code, error = %err, "failed to increment coupon usage");
                }
            }
            Ok(None) => {
                tracing::warn!(coupon = %code, "coupon from session metadata not found");
            }
            Err(err) => {
                tracing::warn!(coupon = %code, error = %err, "coupon lookup failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryCoupons, InMemoryProducts, InMemoryPurchases, InMemorySubscriptions,
        InMemoryUsers, InMemoryWebhookEvents,
    };
    use crate::domain::billing::{
        BillingInterval, CardEventData, Coupon, CouponScope, DiscountKind, Product, ProductKind,
        SubscriptionOrigin,
    };
    use crate::domain::foundation::{CouponId, UserId};
    use crate::ports::BillingUser;
    use serde_json::{json, Value};

    struct Fixture {
        users: Arc<InMemoryUsers>,
        subscriptions: Arc<InMemorySubscriptions>,
        purchases: Arc<InMemoryPurchases>,
        coupons: Arc<InMemoryCoupons>,
        handler: CardWebhookHandler,
        user_id: UserId,
        product: Product,
    }

    fn fixture(product: Product, coupons: Vec<Coupon>) -> Fixture {
        let user_id = UserId::new();
        let mut user = BillingUser::new(user_id, "payer@example.com");
        user.card_customer_id = Some("cus_1".to_string());

        let users = Arc::new(InMemoryUsers::with(vec![user]));
        let products = Arc::new(InMemoryProducts::with(vec![product.clone()]));
        let subscriptions = Arc::new(InMemorySubscriptions::new());
        let purchases = Arc::new(InMemoryPurchases::new());
        let coupons = Arc::new(InMemoryCoupons::with(coupons));
        let events = Arc::new(InMemoryWebhookEvents::new());

        let handler = CardWebhookHandler::new(
            users.clone(),
            products.clone(),
            subscriptions.clone(),
            purchases.clone(),
            coupons.clone(),
            events,
        );

        Fixture {
            users,
            subscriptions,
            purchases,
            coupons,
            handler,
            user_id,
            product,
        }
    }

    fn mirrored_subscription_product() -> Product {
        let mut product = Product::try_new(
            ProductId::new(),
            "Pro Monthly",
            ProductKind::Subscription,
            2000,
            "usd",
            Some(BillingInterval::Month),
        )
        .unwrap();
        product.set_card_mirror("prod_1", "price_1");
        product
    }

    fn event(id: &str, event_type: &str, object: Value) -> CardEvent {
        CardEvent {
            id: id.to_string(),
            event_type: event_type.to_string(),
            created: 1_700_000_000,
            data: CardEventData { object },
            livemode: false,
        }
    }

    fn subscription_object(status: &str) -> Value {
        json!({
            "id": "sub_1",
            "customer": "cus_1",
            "status": status,
            "current_period_start": 1_700_000_000,
            "current_period_end": 1_702_592_000,
            "cancel_at_period_end": false,
            "canceled_at": null,
            "items": {"data": [{"price": {"id": "price_1"}}]}
        })
    }

    // ══════════════════════════════════════════════════════════════
    // Subscription upsert
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn created_event_inserts_subscription_and_mirrors_user() {
        let f = fixture(mirrored_subscription_product(), vec![]);

        let result = f
            .handler
            .handle(event(
                "evt_1",
                "customer.subscription.created",
                subscription_object("active"),
            ))
            .await
            .unwrap();

        assert_eq!(result, WebhookResult::Processed);

        let subs = f.subscriptions.all();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].provider_subscription_id, "sub_1");
        assert_eq!(subs[0].origin, SubscriptionOrigin::Card);
        assert_eq!(subs[0].status, SubscriptionStatus::Active);
        assert_eq!(subs[0].product_id, f.product.id);

        let user = f.users.get(&f.user_id).unwrap();
        assert_eq!(user.subscription_status, Some(SubscriptionStatus::Active));
        assert_eq!(user.current_product, Some(f.product.id));
    }

    #[tokio::test]
    async fn updated_event_updates_existing_row_without_duplicating() {
        let f = fixture(mirrored_subscription_product(), vec![]);

        f.handler
            .handle(event(
                "evt_1",
                "customer.subscription.created",
                subscription_object("active"),
            ))
            .await
            .unwrap();

        f.handler
            .handle(event(
                "evt_2",
                "customer.subscription.updated",
                subscription_object("past_due"),
            ))
            .await
            .unwrap();

        let subs = f.subscriptions.all();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].status, SubscriptionStatus::PastDue);

        let user = f.users.get(&f.user_id).unwrap();
        assert_eq!(user.subscription_status, Some(SubscriptionStatus::PastDue));
    }

    #[tokio::test]
    async fn duplicate_event_id_is_skipped() {
        let f = fixture(mirrored_subscription_product(), vec![]);
        let payload = subscription_object("active");

        let first = f
            .handler
            .handle(event("evt_dup", "customer.subscription.created", payload.clone()))
            .await
            .unwrap();
        let second = f
            .handler
            .handle(event("evt_dup", "customer.subscription.created", payload))
            .await
            .unwrap();

        assert_eq!(first, WebhookResult::Processed);
        assert_eq!(second, WebhookResult::AlreadyProcessed);
        assert_eq!(f.subscriptions.all().len(), 1);
    }

    #[tokio::test]
    async fn replayed_created_event_with_new_id_converges_to_same_state() {
        let f = fixture(mirrored_subscription_product(), vec![]);
        let payload = subscription_object("active");

        f.handler
            .handle(event("evt_a", "customer.subscription.created", payload.clone()))
            .await
            .unwrap();
        f.handler
            .handle(event("evt_b", "customer.subscription.created", payload))
            .await
            .unwrap();

        // Keyed on provider id, the second insert becomes an update.
        assert_eq!(f.subscriptions.all().len(), 1);
    }

    #[tokio::test]
    async fn unknown_customer_is_ignored_not_errored() {
        let f = fixture(mirrored_subscription_product(), vec![]);
        let mut payload = subscription_object("active");
        payload["customer"] = json!("cus_ghost");

        let result = f
            .handler
            .handle(event("evt_1", "customer.subscription.created", payload))
            .await
            .unwrap();

        assert_eq!(result, WebhookResult::Processed);
        assert!(f.subscriptions.all().is_empty());
    }

    #[tokio::test]
    async fn unknown_price_is_ignored() {
        let f = fixture(mirrored_subscription_product(), vec![]);
        let mut payload = subscription_object("active");
        payload["items"] = json!({"data": [{"price": {"id": "price_ghost"}}]});

        let result = f
            .handler
            .handle(event("evt_1", "customer.subscription.created", payload))
            .await
            .unwrap();

        assert_eq!(result, WebhookResult::Processed);
        assert!(f.subscriptions.all().is_empty());
    }

    // ══════════════════════════════════════════════════════════════
    // Deletion and invoices
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn deleted_event_cancels_subscription_and_clears_user_product() {
        let f = fixture(mirrored_subscription_product(), vec![]);

        f.handler
            .handle(event(
                "evt_1",
                "customer.subscription.created",
                subscription_object("active"),
            ))
            .await
            .unwrap();

        f.handler
            .handle(event(
                "evt_2",
                "customer.subscription.deleted",
                subscription_object("canceled"),
            ))
            .await
            .unwrap();

        let subs = f.subscriptions.all();
        assert_eq!(subs[0].status, SubscriptionStatus::Canceled);
        assert!(subs[0].canceled_at.is_some());

        let user = f.users.get(&f.user_id).unwrap();
        assert_eq!(user.subscription_status, Some(SubscriptionStatus::Canceled));
        assert_eq!(user.current_product, None);
    }

    #[tokio::test]
    async fn payment_failed_mirrors_past_due_keeping_product() {
        let f = fixture(mirrored_subscription_product(), vec![]);

        f.handler
            .handle(event(
                "evt_1",
                "customer.subscription.created",
                subscription_object("active"),
            ))
            .await
            .unwrap();

        f.handler
            .handle(event(
                "evt_2",
                "invoice.payment_failed",
                json!({"id": "in_1", "customer": "cus_1"}),
            ))
            .await
            .unwrap();

        let user = f.users.get(&f.user_id).unwrap();
        assert_eq!(user.subscription_status, Some(SubscriptionStatus::PastDue));
        // The payment-failed mirror leaves the product in place.
        assert_eq!(user.current_product, Some(f.product.id));
    }

    #[tokio::test]
    async fn payment_succeeded_is_informational() {
        let f = fixture(mirrored_subscription_product(), vec![]);

        let result = f
            .handler
            .handle(event(
                "evt_1",
                "invoice.payment_succeeded",
                json!({"id": "in_1", "customer": "cus_1"}),
            ))
            .await
            .unwrap();

        assert_eq!(result, WebhookResult::Processed);
        assert!(f.subscriptions.all().is_empty());
    }

    // ══════════════════════════════════════════════════════════════
    // Checkout session completion
    // ══════════════════════════════════════════════════════════════

    fn one_time_session(f: &Fixture, coupon_code: Option<&str>) -> Value {
        let mut metadata = json!({
            "user_id": f.user_id.to_string(),
            "product_id": f.product.id.to_string(),
            "type": "one_time"
        });
        if let Some(code) = coupon_code {
            metadata["coupon_code"] = json!(code);
        }
        json!({
            "id": "cs_1",
            "customer": "cus_1",
            "mode": "payment",
            "payment_intent": "pi_1",
            "amount_total": 999,
            "currency": "usd",
            "metadata": metadata
        })
    }

    fn one_time_product() -> Product {
        Product::try_new(ProductId::new(), "E-book", ProductKind::OneTime, 999, "usd", None)
            .unwrap()
    }

    #[tokio::test]
    async fn completed_one_time_session_books_purchase() {
        let f = fixture(one_time_product(), vec![]);

        f.handler
            .handle(event(
                "evt_1",
                "checkout.session.completed",
                one_time_session(&f, None),
            ))
            .await
            .unwrap();

        let purchases = f.purchases.all();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].provider_payment_id, "pi_1");
        assert_eq!(purchases[0].amount, 999);
        assert_eq!(purchases[0].user_id, f.user_id);
    }

    #[tokio::test]
    async fn completed_session_with_coupon_increments_usage_case_normalized() {
        let coupon = Coupon::try_new(
            CouponId::new(),
            "SAVE20",
            "Save",
            DiscountKind::Percentage,
            20,
            CouponScope::All,
        )
        .unwrap();
        let f = fixture(one_time_product(), vec![coupon]);

        f.handler
            .handle(event(
                "evt_1",
                "checkout.session.completed",
                one_time_session(&f, Some("save20")),
            ))
            .await
            .unwrap();

        assert_eq!(f.coupons.usage_of("SAVE20"), Some(1));
    }

    #[tokio::test]
    async fn subscription_mode_session_is_ignored() {
        let f = fixture(mirrored_subscription_product(), vec![]);
        let mut session = one_time_session(&f, None);
        session["mode"] = json!("subscription");

        let result = f
            .handler
            .handle(event("evt_1", "checkout.session.completed", session))
            .await
            .unwrap();

        assert_eq!(result, WebhookResult::Processed);
        assert!(f.purchases.all().is_empty());
    }

    #[tokio::test]
    async fn session_without_metadata_is_dropped() {
        let f = fixture(one_time_product(), vec![]);
        let mut session = one_time_session(&f, None);
        session["metadata"] = json!({});

        let result = f
            .handler
            .handle(event("evt_1", "checkout.session.completed", session))
            .await
            .unwrap();

        assert_eq!(result, WebhookResult::Processed);
        assert!(f.purchases.all().is_empty());
    }

    #[tokio::test]
    async fn duplicate_session_delivery_books_one_purchase() {
        let f = fixture(one_time_product(), vec![]);

        f.handler
            .handle(event(
                "evt_1",
                "checkout.session.completed",
                one_time_session(&f, None),
            ))
            .await
            .unwrap();
        // Same session under a fresh event id: the purchase-reference
        // check still prevents double booking.
        f.handler
            .handle(event(
                "evt_2",
                "checkout.session.completed",
                one_time_session(&f, None),
            ))
            .await
            .unwrap();

        assert_eq!(f.purchases.all().len(), 1);
    }

    #[tokio::test]
    async fn unknown_event_type_is_acknowledged() {
        let f = fixture(one_time_product(), vec![]);

        let result = f
            .handler
            .handle(event("evt_1", "customer.tax_id.created", json!({})))
            .await
            .unwrap();

        assert_eq!(result, WebhookResult::Processed);
    }
}
