//! CheckoutHandler - builds a priced, coupon-adjusted checkout on either
//! payment rail.
//!
//! One orchestrator owns the shared steps (coupon validation, the 100%-off
//! short-circuit, product resolution, final-price arithmetic) and then
//! dispatches to the rail-specific tail. The crypto rail has no native
//! recurring billing, so monthly subscriptions become prepaid single
//! payments with locally tracked periods.

use std::sync::Arc;

use crate::domain::billing::{
    order_id, BillingError, Coupon, PaymentIntent, PaymentKind, Product, ProductKind, Purchase,
    Subscription,
};
use crate::domain::foundation::{ProductId, Timestamp, UserId};
use crate::ports::{
    BillingUser, CardRail, CheckoutMetadata, CheckoutMode, CouponRepository, CreateCardCheckout,
    CreateCryptoPayment, CryptoRail, PaymentIntentRepository, ProductRepository,
    PurchaseRepository, SubscriptionRepository, UserDirectory,
};

use super::validate_coupon::ValidateCouponHandler;

/// Which rail the checkout goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutRail {
    Card,
    Crypto,
}

/// Default redirect/callback URLs derived from the public base URL.
#[derive(Debug, Clone)]
pub struct RedirectUrls {
    base_url: String,
}

impl RedirectUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    pub fn checkout_success(&self) -> String {
        format!("{}/dash?success=true", self.base_url)
    }

    pub fn checkout_cancel(&self) -> String {
        format!("{}/dash?canceled=true", self.base_url)
    }

    pub fn crypto_callback(&self) -> String {
        format!("{}/api/cryptomus/webhook", self.base_url)
    }

    pub fn renewal_success(&self) -> String {
        format!("{}/dash?renewal=success", self.base_url)
    }

    pub fn renewal_cancel(&self) -> String {
        format!("{}/dash?renewal=canceled", self.base_url)
    }

    pub fn portal_return(&self) -> String {
        format!("{}/dash", self.base_url)
    }
}

/// Command to start a checkout.
#[derive(Debug, Clone)]
pub struct CheckoutCommand {
    pub user_id: UserId,
    pub rail: CheckoutRail,
    pub product_id: ProductId,
    pub price_type: ProductKind,
    pub coupon_code: Option<String>,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

/// Result of a started (or short-circuited) checkout.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    /// Where to send the user next: a hosted payment page, or the success
    /// URL when no payment is needed.
    pub url: String,
    /// Card-rail session id.
    pub session_id: Option<String>,
    /// Crypto-rail payment uuid.
    pub payment_id: Option<String>,
    /// Crypto-rail order id.
    pub order_id: Option<String>,
    /// True for monthly subscriptions emulated as prepaid payments.
    pub is_prepaid: bool,
}

/// Handler for checkout on both rails.
pub struct CheckoutHandler {
    products: Arc<dyn ProductRepository>,
    coupons: Arc<dyn CouponRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    purchases: Arc<dyn PurchaseRepository>,
    intents: Arc<dyn PaymentIntentRepository>,
    users: Arc<dyn UserDirectory>,
    card: Arc<dyn CardRail>,
    crypto: Arc<dyn CryptoRail>,
    urls: RedirectUrls,
}

impl CheckoutHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        products: Arc<dyn ProductRepository>,
        coupons: Arc<dyn CouponRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        purchases: Arc<dyn PurchaseRepository>,
        intents: Arc<dyn PaymentIntentRepository>,
        users: Arc<dyn UserDirectory>,
        card: Arc<dyn CardRail>,
        crypto: Arc<dyn CryptoRail>,
        urls: RedirectUrls,
    ) -> Self {
        Self {
            products,
            coupons,
            subscriptions,
            purchases,
            intents,
            users,
            card,
            crypto,
            urls,
        }
    }

    pub async fn handle(&self, cmd: CheckoutCommand) -> Result<CheckoutOutcome, BillingError> {
        // 1. The checkout surface requires an authenticated, existing user.
        let Some(user) = self.users.find_by_id(&cmd.user_id).await? else {
            return Err(BillingError::Unauthenticated);
        };

        // 2. Validate the coupon up front; a 100%-off percentage coupon
        //    short-circuits without contacting any rail.
        let coupon = match &cmd.coupon_code {
            Some(code) => {
                let validator =
                    ValidateCouponHandler::new(self.coupons.clone(), self.products.clone());
                let validation = validator.handle(code, Some(cmd.product_id)).await?;
                match validation.coupon {
                    Some(coupon) if validation.valid => Some(coupon),
                    _ => {
                        let reason = validation
                            .error
                            .unwrap_or_else(|| "Invalid coupon".to_string());
                        return Err(BillingError::CouponRejected(reason));
                    }
                }
            }
            None => None,
        };

        if let Some(coupon) = coupon.as_ref().filter(|c| c.is_full_discount()) {
            return self.grant_free_product(&cmd, coupon).await;
        }

        // 3. Resolve the product by id and expected kind.
        let product = self
            .products
            .find_by_id_and_kind(&cmd.product_id, cmd.price_type)
            .await?
            .ok_or(BillingError::NotFound("Product"))?;

        match cmd.rail {
            CheckoutRail::Crypto => self.crypto_checkout(&cmd, &user, product, coupon).await,
            CheckoutRail::Card => self.card_checkout(&cmd, user, product, coupon).await,
        }
    }

    /// Final price after the (non-100%) coupon, minor units.
    fn final_price(product: &Product, coupon: Option<&Coupon>) -> i64 {
        match coupon {
            Some(coupon) => coupon.apply_discount(product.price),
            None => product.price,
        }
    }

    /// 100%-off short-circuit: materialize the grant directly against the
    /// ledger and send the user to the success URL.
    async fn grant_free_product(
        &self,
        cmd: &CheckoutCommand,
        coupon: &Coupon,
    ) -> Result<CheckoutOutcome, BillingError> {
        let product = self
            .products
            .find_by_id_and_kind(&cmd.product_id, cmd.price_type)
            .await?
            .ok_or(BillingError::NotFound("Product"))?;

        let now = Timestamp::now();
        let crypto_checkout = cmd.rail == CheckoutRail::Crypto;

        match product.kind {
            ProductKind::Subscription => {
                let subscription =
                    Subscription::promotional(cmd.user_id, product.id, crypto_checkout, now);
                self.subscriptions.save(&subscription).await?;
            }
            ProductKind::OneTime => {
                let purchase = Purchase::promotional(cmd.user_id, product.id, crypto_checkout, now);
                self.purchases.save(&purchase).await?;
            }
        }

        // Coupon bookkeeping never blocks the grant.
        if let Err(err) = self.coupons.increment_usage(&coupon.id).await {
            tracing::warn!(coupon = %coupon.code, error = %err, "failed to increment coupon usage");
        }

        Ok(CheckoutOutcome {
            url: cmd
                .success_url
                .clone()
                .unwrap_or_else(|| self.urls.checkout_success()),
            session_id: None,
            payment_id: None,
            order_id: None,
            is_prepaid: false,
        })
    }

    /// Crypto-rail tail: create a single payment and persist the pending
    /// intent before handing the user the payment URL.
    async fn crypto_checkout(
        &self,
        cmd: &CheckoutCommand,
        user: &BillingUser,
        product: Product,
        coupon: Option<Coupon>,
    ) -> Result<CheckoutOutcome, BillingError> {
        let amount = Self::final_price(&product, coupon.as_ref());

        // Monthly subscriptions cannot recur natively on this rail; charge
        // one period up front and track the boundary locally.
        let (kind, is_prepaid) = if cmd.price_type == ProductKind::Subscription
            && product.is_monthly_subscription()
        {
            (PaymentKind::PrepaidSubscription, true)
        } else {
            let kind = match cmd.price_type {
                ProductKind::OneTime => PaymentKind::OneTime,
                ProductKind::Subscription => PaymentKind::Subscription,
            };
            (kind, false)
        };

        let order_id = order_id(kind, product.id, user.id, Timestamp::now());

        let payment = self
            .crypto
            .create_payment(CreateCryptoPayment {
                amount,
                currency: product.currency.clone(),
                order_id: order_id.clone(),
                return_url: Some(
                    cmd.cancel_url
                        .clone()
                        .unwrap_or_else(|| self.urls.checkout_cancel()),
                ),
                success_url: Some(
                    cmd.success_url
                        .clone()
                        .unwrap_or_else(|| self.urls.checkout_success()),
                ),
                callback_url: Some(self.urls.crypto_callback()),
            })
            .await?;

        let mut intent = PaymentIntent::pending(
            user.id,
            product.id,
            &payment.uuid,
            &order_id,
            amount,
            &product.currency,
            kind,
            &payment.url,
        );
        if let Some(coupon) = &coupon {
            intent = intent.with_coupon(&coupon.code);
        }
        self.intents.save(&intent).await?;

        tracing::info!(
            order_id = %order_id,
            payment_uuid = %payment.uuid,
            kind = ?kind,
            "created crypto payment"
        );

        Ok(CheckoutOutcome {
            url: payment.url,
            session_id: None,
            payment_id: Some(payment.uuid),
            order_id: Some(order_id),
            is_prepaid,
        })
    }

    /// Card-rail tail: lazily mirror customer/product/coupon onto the
    /// provider, then open a checkout session.
    async fn card_checkout(
        &self,
        cmd: &CheckoutCommand,
        user: BillingUser,
        mut product: Product,
        coupon: Option<Coupon>,
    ) -> Result<CheckoutOutcome, BillingError> {
        let customer_id = match &user.card_customer_id {
            Some(id) => id.clone(),
            None => {
                let id = self
                    .card
                    .create_customer(&user.id, &user.email, user.name.as_deref())
                    .await?;
                self.users.set_card_customer_id(&user.id, &id).await?;
                id
            }
        };

        let mirror = self.card.ensure_product_mirror(&product).await?;
        if product.card_product_id.as_deref() != Some(mirror.product_id.as_str())
            || product.card_price_id.as_deref() != Some(mirror.price_id.as_str())
        {
            product.set_card_mirror(&mirror.product_id, &mirror.price_id);
            self.products.update(&product).await?;
        }

        let discount_coupon_id = match coupon {
            Some(mut coupon) => {
                let mirror_id = self.card.ensure_coupon_mirror(&coupon).await?;
                if coupon.card_coupon_id.as_deref() != Some(mirror_id.as_str()) {
                    coupon.card_coupon_id = Some(mirror_id.clone());
                    self.coupons.update(&coupon).await?;
                }
                Some(mirror_id)
            }
            None => None,
        };

        let mode = match cmd.price_type {
            ProductKind::Subscription => CheckoutMode::Subscription,
            ProductKind::OneTime => CheckoutMode::Payment,
        };

        let session = self
            .card
            .create_checkout_session(CreateCardCheckout {
                customer_id,
                price_id: mirror.price_id,
                mode,
                discount_coupon_id,
                metadata: CheckoutMetadata {
                    user_id: user.id,
                    product_id: product.id,
                    price_type: cmd.price_type.as_str().to_string(),
                    coupon_code: cmd.coupon_code.clone().map(|c| c.to_uppercase()),
                },
                success_url: cmd
                    .success_url
                    .clone()
                    .unwrap_or_else(|| self.urls.checkout_success()),
                cancel_url: cmd
                    .cancel_url
                    .clone()
                    .unwrap_or_else(|| self.urls.checkout_cancel()),
            })
            .await?;

        tracing::info!(session_id = %session.id, product = %product.id, "created card checkout session");

        Ok(CheckoutOutcome {
            url: session.url,
            session_id: Some(session.id),
            payment_id: None,
            order_id: None,
            is_prepaid: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        InMemoryCoupons, InMemoryPaymentIntents, InMemoryProducts, InMemoryPurchases,
        InMemorySubscriptions, InMemoryUsers,
    };
    use crate::application::handlers::billing::test_support::{MockCardRail, MockCryptoRail};
    use crate::domain::billing::{
        BillingInterval, CouponScope, DiscountKind, PaymentIntentStatus, PurchaseStatus,
        SubscriptionStatus,
    };
    use crate::domain::foundation::CouponId;

    struct Fixture {
        products: Arc<InMemoryProducts>,
        coupons: Arc<InMemoryCoupons>,
        subscriptions: Arc<InMemorySubscriptions>,
        purchases: Arc<InMemoryPurchases>,
        intents: Arc<InMemoryPaymentIntents>,
        users: Arc<InMemoryUsers>,
        card: Arc<MockCardRail>,
        crypto: Arc<MockCryptoRail>,
        handler: CheckoutHandler,
        user_id: UserId,
    }

    fn fixture(products: Vec<Product>, coupons: Vec<Coupon>) -> Fixture {
        let user_id = UserId::new();
        let products = Arc::new(InMemoryProducts::with(products));
        let coupons = Arc::new(InMemoryCoupons::with(coupons));
        let subscriptions = Arc::new(InMemorySubscriptions::new());
        let purchases = Arc::new(InMemoryPurchases::new());
        let intents = Arc::new(InMemoryPaymentIntents::new());
        let users = Arc::new(InMemoryUsers::with(vec![BillingUser::new(
            user_id,
            "payer@example.com",
        )]));
        let card = Arc::new(MockCardRail::new());
        let crypto = Arc::new(MockCryptoRail::new());

        let handler = CheckoutHandler::new(
            products.clone(),
            coupons.clone(),
            subscriptions.clone(),
            purchases.clone(),
            intents.clone(),
            users.clone(),
            card.clone(),
            crypto.clone(),
            RedirectUrls::new("https://app.example.com"),
        );

        Fixture {
            products,
            coupons,
            subscriptions,
            purchases,
            intents,
            users,
            card,
            crypto,
            handler,
            user_id,
        }
    }

    fn monthly_subscription() -> Product {
        Product::try_new(
            ProductId::new(),
            "Pro Monthly",
            ProductKind::Subscription,
            2000,
            "usd",
            Some(BillingInterval::Month),
        )
        .unwrap()
    }

    fn yearly_subscription() -> Product {
        Product::try_new(
            ProductId::new(),
            "Pro Yearly",
            ProductKind::Subscription,
            20000,
            "usd",
            Some(BillingInterval::Year),
        )
        .unwrap()
    }

    fn one_time() -> Product {
        Product::try_new(ProductId::new(), "E-book", ProductKind::OneTime, 999, "usd", None)
            .unwrap()
    }

    fn command(f: &Fixture, rail: CheckoutRail, product: &Product) -> CheckoutCommand {
        CheckoutCommand {
            user_id: f.user_id,
            rail,
            product_id: product.id,
            price_type: product.kind,
            coupon_code: None,
            success_url: None,
            cancel_url: None,
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Authentication and lookup failures
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unknown_user_is_unauthenticated() {
        let product = one_time();
        let f = fixture(vec![product.clone()], vec![]);
        let mut cmd = command(&f, CheckoutRail::Crypto, &product);
        cmd.user_id = UserId::new();

        let err = f.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, BillingError::Unauthenticated));
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let f = fixture(vec![], vec![]);
        let cmd = CheckoutCommand {
            user_id: f.user_id,
            rail: CheckoutRail::Crypto,
            product_id: ProductId::new(),
            price_type: ProductKind::OneTime,
            coupon_code: None,
            success_url: None,
            cancel_url: None,
        };

        let err = f.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, BillingError::NotFound("Product")));
    }

    #[tokio::test]
    async fn product_of_wrong_kind_is_not_found() {
        let product = one_time();
        let f = fixture(vec![product.clone()], vec![]);
        let mut cmd = command(&f, CheckoutRail::Crypto, &product);
        cmd.price_type = ProductKind::Subscription;

        let err = f.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, BillingError::NotFound("Product")));
    }

    #[tokio::test]
    async fn invalid_coupon_fails_checkout() {
        let product = one_time();
        let f = fixture(vec![product.clone()], vec![]);
        let mut cmd = command(&f, CheckoutRail::Crypto, &product);
        cmd.coupon_code = Some("NOPE".into());

        let err = f.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, BillingError::CouponRejected(_)));
        assert!(f.crypto.created().is_empty());
    }

    // ══════════════════════════════════════════════════════════════
    // 100%-off short-circuit
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn full_discount_one_time_creates_free_purchase_without_rail_calls() {
        let product = one_time();
        let coupon = Coupon::try_new(
            CouponId::new(),
            "FREE100",
            "Free",
            DiscountKind::Percentage,
            100,
            CouponScope::All,
        )
        .unwrap();
        let f = fixture(vec![product.clone()], vec![coupon]);
        let mut cmd = command(&f, CheckoutRail::Crypto, &product);
        cmd.coupon_code = Some("FREE100".into());

        let outcome = f.handler.handle(cmd).await.unwrap();

        assert!(outcome.payment_id.is_none());
        assert!(outcome.session_id.is_none());
        assert_eq!(outcome.url, "https://app.example.com/dash?success=true");

        let purchases = f.purchases.all();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].amount, 0);
        assert_eq!(purchases[0].status, PurchaseStatus::Completed);
        assert!(purchases[0].provider_payment_id.starts_with("free_crypto_"));

        assert_eq!(f.coupons.usage_of("FREE100"), Some(1));
        assert!(f.crypto.created().is_empty());
        assert!(f.card.sessions().is_empty());
    }

    #[tokio::test]
    async fn full_discount_subscription_creates_active_30_day_subscription() {
        let product = monthly_subscription();
        let coupon = Coupon::try_new(
            CouponId::new(),
            "FREE100",
            "Free",
            DiscountKind::Percentage,
            100,
            CouponScope::All,
        )
        .unwrap();
        let f = fixture(vec![product.clone()], vec![coupon]);
        let mut cmd = command(&f, CheckoutRail::Card, &product);
        cmd.coupon_code = Some("FREE100".into());

        f.handler.handle(cmd).await.unwrap();

        let subs = f.subscriptions.all();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].status, SubscriptionStatus::Active);
        assert!(subs[0].provider_subscription_id.starts_with("free_"));
        let days = subs[0]
            .current_period_end
            .as_unix_secs()
            - subs[0].current_period_start.as_unix_secs();
        assert_eq!(days, 30 * 24 * 60 * 60);
    }

    #[tokio::test]
    async fn full_fixed_discount_does_not_short_circuit() {
        // A fixed discount that zeroes the price still goes to the rail.
        let product = one_time();
        let coupon = Coupon::try_new(
            CouponId::new(),
            "BIGFIX",
            "Big fixed",
            DiscountKind::Fixed,
            999,
            CouponScope::All,
        )
        .unwrap();
        let f = fixture(vec![product.clone()], vec![coupon]);
        let mut cmd = command(&f, CheckoutRail::Crypto, &product);
        cmd.coupon_code = Some("BIGFIX".into());

        let outcome = f.handler.handle(cmd).await.unwrap();
        assert!(outcome.payment_id.is_some());
        assert_eq!(f.crypto.created().len(), 1);
        assert_eq!(f.crypto.created()[0].amount, 0);
    }

    // ══════════════════════════════════════════════════════════════
    // Crypto rail
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn monthly_crypto_subscription_becomes_prepaid() {
        let product = monthly_subscription();
        let f = fixture(vec![product.clone()], vec![]);

        let outcome = f
            .handler
            .handle(command(&f, CheckoutRail::Crypto, &product))
            .await
            .unwrap();

        assert!(outcome.is_prepaid);
        let order_id = outcome.order_id.unwrap();
        assert!(order_id.starts_with("prepaid_sub_"));
        assert!(order_id.contains(&product.id.to_string()));
        assert!(order_id.contains(&f.user_id.to_string()));

        let intents = f.intents.all();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].kind, PaymentKind::PrepaidSubscription);
        assert_eq!(intents[0].status, PaymentIntentStatus::Pending);
        assert_eq!(intents[0].amount, 2000);
    }

    #[tokio::test]
    async fn yearly_crypto_subscription_is_a_plain_subscription_payment() {
        let product = yearly_subscription();
        let f = fixture(vec![product.clone()], vec![]);

        let outcome = f
            .handler
            .handle(command(&f, CheckoutRail::Crypto, &product))
            .await
            .unwrap();

        assert!(!outcome.is_prepaid);
        assert!(outcome.order_id.unwrap().starts_with("subscription_"));
        assert_eq!(f.intents.all()[0].kind, PaymentKind::Subscription);
    }

    #[tokio::test]
    async fn crypto_one_time_records_discounted_pending_intent() {
        let product = one_time();
        let coupon = Coupon::try_new(
            CouponId::new(),
            "SAVE20",
            "Save 20",
            DiscountKind::Percentage,
            20,
            CouponScope::All,
        )
        .unwrap();
        let f = fixture(vec![product.clone()], vec![coupon]);
        let mut cmd = command(&f, CheckoutRail::Crypto, &product);
        cmd.coupon_code = Some("save20".into());

        let outcome = f.handler.handle(cmd).await.unwrap();

        assert!(outcome.order_id.unwrap().starts_with("one_time_"));
        let intents = f.intents.all();
        assert_eq!(intents[0].amount, 799); // round(999 * 0.8)
        assert_eq!(intents[0].coupon_code.as_deref(), Some("SAVE20"));
        // Coupon usage is booked on webhook confirmation, not at checkout.
        assert_eq!(f.coupons.usage_of("SAVE20"), Some(0));
    }

    #[tokio::test]
    async fn crypto_checkout_passes_callback_urls() {
        let product = one_time();
        let f = fixture(vec![product.clone()], vec![]);

        f.handler
            .handle(command(&f, CheckoutRail::Crypto, &product))
            .await
            .unwrap();

        let request = &f.crypto.created()[0];
        assert_eq!(
            request.callback_url.as_deref(),
            Some("https://app.example.com/api/cryptomus/webhook")
        );
        assert_eq!(
            request.success_url.as_deref(),
            Some("https://app.example.com/dash?success=true")
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Card rail
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn card_checkout_creates_customer_and_mirrors_lazily() {
        let product = monthly_subscription();
        let f = fixture(vec![product.clone()], vec![]);

        let outcome = f
            .handler
            .handle(command(&f, CheckoutRail::Card, &product))
            .await
            .unwrap();

        assert!(outcome.session_id.is_some());
        assert!(!outcome.is_prepaid);

        // Customer id mirrored onto the user record.
        let user = f.users.get(&f.user_id).unwrap();
        assert!(user.card_customer_id.is_some());

        // Product mirror persisted.
        let stored = f.products.find_by_id(&product.id).await.unwrap().unwrap();
        assert!(stored.has_card_mirror());

        // Session built in subscription mode with metadata.
        let sessions = f.card.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].mode, CheckoutMode::Subscription);
        assert_eq!(sessions[0].metadata.product_id, product.id);
        assert!(sessions[0].discount_coupon_id.is_none());
    }

    #[tokio::test]
    async fn card_checkout_reuses_existing_customer() {
        let product = one_time();
        let f = fixture(vec![product.clone()], vec![]);
        f.users
            .set_card_customer_id(&f.user_id, "cus_existing")
            .await
            .unwrap();

        f.handler
            .handle(command(&f, CheckoutRail::Card, &product))
            .await
            .unwrap();

        assert_eq!(f.card.customers_created(), 0);
        assert_eq!(f.card.sessions()[0].customer_id, "cus_existing");
        assert_eq!(f.card.sessions()[0].mode, CheckoutMode::Payment);
    }

    #[tokio::test]
    async fn card_checkout_attaches_mirrored_coupon() {
        let product = one_time();
        let coupon = Coupon::try_new(
            CouponId::new(),
            "SAVE20",
            "Save 20",
            DiscountKind::Percentage,
            20,
            CouponScope::All,
        )
        .unwrap();
        let coupon_id = coupon.id;
        let f = fixture(vec![product.clone()], vec![coupon]);
        let mut cmd = command(&f, CheckoutRail::Card, &product);
        cmd.coupon_code = Some("SAVE20".into());

        f.handler.handle(cmd).await.unwrap();

        let sessions = f.card.sessions();
        assert!(sessions[0].discount_coupon_id.is_some());
        assert_eq!(sessions[0].metadata.coupon_code.as_deref(), Some("SAVE20"));

        // Mirror id written back onto the coupon.
        let stored = f.coupons.find_by_id(&coupon_id).await.unwrap().unwrap();
        assert!(stored.card_coupon_id.is_some());
    }

    #[tokio::test]
    async fn rail_failure_surfaces_as_provider_error() {
        let product = one_time();
        let f = fixture(vec![product.clone()], vec![]);
        f.crypto.fail_next("gateway unavailable");

        let err = f
            .handler
            .handle(command(&f, CheckoutRail::Crypto, &product))
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::Provider(_)));
        // Nothing persisted: a failed create leaves no ledger row.
        assert!(f.intents.all().is_empty());
    }
}
