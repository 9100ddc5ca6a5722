//! In-memory repository adapters.
//!
//! The real document store is an external collaborator reached over the
//! network; these adapters satisfy the same ports from process memory for
//! development and tests. Locks use `.expect()` - acceptable here, since
//! these stores never back a production deployment.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::billing::{
    Coupon, PaymentIntent, Product, ProductKind, Purchase, RenewalReminder, Subscription,
    SubscriptionStatus,
};
use crate::domain::foundation::{
    CouponId, DomainError, ErrorCode, ProductId, SubscriptionId, Timestamp, UserId,
};
use crate::ports::{
    BillingUser, CouponRepository, PaymentIntentRepository, ProductRepository, PurchaseRepository,
    ReminderRepository, RenewalNotifier, SaveResult, SubscriptionRepository, UserDirectory,
    WebhookEventRecord, WebhookEventRepository,
};

fn poisoned(_: impl std::fmt::Debug) -> DomainError {
    DomainError::database("store lock poisoned")
}

// ════════════════════════════════════════════════════════════════════════════
// Products
// ════════════════════════════════════════════════════════════════════════════

/// In-memory product store.
#[derive(Default)]
pub struct InMemoryProducts {
    rows: RwLock<Vec<Product>>,
}

impl InMemoryProducts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(rows: Vec<Product>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }
}

#[async_trait]
impl ProductRepository for InMemoryProducts {
    async fn save(&self, product: &Product) -> Result<(), DomainError> {
        self.rows.write().map_err(poisoned)?.push(product.clone());
        Ok(())
    }

    async fn update(&self, product: &Product) -> Result<(), DomainError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        match rows.iter_mut().find(|p| p.id == product.id) {
            Some(row) => {
                *row = product.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::ProductNotFound,
                "Product not found",
            )),
        }
    }

    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, DomainError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|p| &p.id == id)
            .cloned())
    }

    async fn find_by_id_and_kind(
        &self,
        id: &ProductId,
        kind: ProductKind,
    ) -> Result<Option<Product>, DomainError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|p| &p.id == id && p.kind == kind)
            .cloned())
    }

    async fn find_by_card_price_id(
        &self,
        price_id: &str,
    ) -> Result<Option<Product>, DomainError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|p| p.card_price_id.as_deref() == Some(price_id))
            .cloned())
    }

    async fn find_active(&self) -> Result<Vec<Product>, DomainError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|p| p.active)
            .cloned()
            .collect())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Coupons
// ════════════════════════════════════════════════════════════════════════════

/// In-memory coupon store.
#[derive(Default)]
pub struct InMemoryCoupons {
    rows: RwLock<Vec<Coupon>>,
}

impl InMemoryCoupons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(rows: Vec<Coupon>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Test helper: current usage count for a code.
    pub fn usage_of(&self, code: &str) -> Option<u32> {
        self.rows
            .read()
            .ok()?
            .iter()
            .find(|c| c.code == code)
            .map(|c| c.current_uses)
    }
}

#[async_trait]
impl CouponRepository for InMemoryCoupons {
    async fn save(&self, coupon: &Coupon) -> Result<(), DomainError> {
        self.rows.write().map_err(poisoned)?.push(coupon.clone());
        Ok(())
    }

    async fn update(&self, coupon: &Coupon) -> Result<(), DomainError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        match rows.iter_mut().find(|c| c.id == coupon.id) {
            Some(row) => {
                *row = coupon.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::CouponNotFound,
                "Coupon not found",
            )),
        }
    }

    async fn find_by_id(&self, id: &CouponId) -> Result<Option<Coupon>, DomainError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|c| &c.id == id)
            .cloned())
    }

    async fn find_active_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|c| c.code == code && c.active)
            .cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|c| c.code == code)
            .cloned())
    }

    async fn increment_usage(&self, id: &CouponId) -> Result<bool, DomainError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        match rows.iter_mut().find(|c| &c.id == id) {
            Some(coupon) => {
                coupon.record_use();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Payment intents
// ════════════════════════════════════════════════════════════════════════════

/// In-memory payment intent store.
#[derive(Default)]
pub struct InMemoryPaymentIntents {
    rows: RwLock<Vec<PaymentIntent>>,
}

impl InMemoryPaymentIntents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(rows: Vec<PaymentIntent>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Test helper: snapshot of all rows.
    pub fn all(&self) -> Vec<PaymentIntent> {
        self.rows.read().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PaymentIntentRepository for InMemoryPaymentIntents {
    async fn save(&self, intent: &PaymentIntent) -> Result<(), DomainError> {
        self.rows.write().map_err(poisoned)?.push(intent.clone());
        Ok(())
    }

    async fn update(&self, intent: &PaymentIntent) -> Result<(), DomainError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        match rows.iter_mut().find(|i| i.id == intent.id) {
            Some(row) => {
                *row = intent.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::PaymentNotFound,
                "Payment intent not found",
            )),
        }
    }

    async fn find_by_provider_uuid(
        &self,
        uuid: &str,
    ) -> Result<Option<PaymentIntent>, DomainError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|i| i.provider_uuid == uuid)
            .cloned())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Subscriptions
// ════════════════════════════════════════════════════════════════════════════

/// In-memory subscription store.
#[derive(Default)]
pub struct InMemorySubscriptions {
    rows: RwLock<Vec<Subscription>>,
}

impl InMemorySubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(rows: Vec<Subscription>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Test helper: snapshot of all rows.
    pub fn all(&self) -> Vec<Subscription> {
        self.rows.read().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptions {
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        self.rows
            .write()
            .map_err(poisoned)?
            .push(subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        match rows.iter_mut().find(|s| s.id == subscription.id) {
            Some(row) => {
                *row = subscription.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                "Subscription not found",
            )),
        }
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|s| &s.id == id)
            .cloned())
    }

    async fn find_by_id_for_user(
        &self,
        id: &SubscriptionId,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|s| &s.id == id && &s.user_id == user_id)
            .cloned())
    }

    async fn find_by_provider_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|s| s.provider_subscription_id == provider_subscription_id)
            .cloned())
    }

    async fn find_current_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|s| &s.user_id == user_id && s.is_current())
            .cloned())
    }

    async fn find_active_ending_before(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|s| s.status == SubscriptionStatus::Active && s.current_period_end < cutoff)
            .cloned()
            .collect())
    }

    async fn find_active_for_user_ending_before(
        &self,
        user_id: &UserId,
        cutoff: Timestamp,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|s| {
                &s.user_id == user_id
                    && s.status == SubscriptionStatus::Active
                    && s.current_period_end < cutoff
            })
            .cloned()
            .collect())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Purchases
// ════════════════════════════════════════════════════════════════════════════

/// In-memory purchase store.
#[derive(Default)]
pub struct InMemoryPurchases {
    rows: RwLock<Vec<Purchase>>,
}

impl InMemoryPurchases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: snapshot of all rows.
    pub fn all(&self) -> Vec<Purchase> {
        self.rows.read().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PurchaseRepository for InMemoryPurchases {
    async fn save(&self, purchase: &Purchase) -> Result<(), DomainError> {
        self.rows.write().map_err(poisoned)?.push(purchase.clone());
        Ok(())
    }

    async fn find_by_provider_payment_id(
        &self,
        provider_payment_id: &str,
    ) -> Result<Option<Purchase>, DomainError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|p| p.provider_payment_id == provider_payment_id)
            .cloned())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Renewal reminders
// ════════════════════════════════════════════════════════════════════════════

/// In-memory reminder store.
#[derive(Default)]
pub struct InMemoryReminders {
    rows: RwLock<Vec<RenewalReminder>>,
}

impl InMemoryReminders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(rows: Vec<RenewalReminder>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Test helper: snapshot of all rows.
    pub fn all(&self) -> Vec<RenewalReminder> {
        self.rows.read().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ReminderRepository for InMemoryReminders {
    async fn save(&self, reminder: &RenewalReminder) -> Result<(), DomainError> {
        self.rows.write().map_err(poisoned)?.push(reminder.clone());
        Ok(())
    }

    async fn update(&self, reminder: &RenewalReminder) -> Result<(), DomainError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        match rows.iter_mut().find(|r| r.id == reminder.id) {
            Some(row) => {
                *row = reminder.clone();
                Ok(())
            }
            None => Err(DomainError::database("Reminder not found")),
        }
    }

    async fn find_pending_due(
        &self,
        now: Timestamp,
    ) -> Result<Vec<RenewalReminder>, DomainError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|r| r.is_due(now))
            .cloned()
            .collect())
    }

    async fn find_pending_for_user_product(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
    ) -> Result<Vec<RenewalReminder>, DomainError> {
        use crate::domain::billing::ReminderStatus;
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .filter(|r| {
                &r.user_id == user_id
                    && &r.product_id == product_id
                    && r.status == ReminderStatus::Pending
            })
            .cloned()
            .collect())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Users
// ════════════════════════════════════════════════════════════════════════════

/// In-memory user directory.
#[derive(Default)]
pub struct InMemoryUsers {
    rows: RwLock<Vec<BillingUser>>,
}

impl InMemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(rows: Vec<BillingUser>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Test helper: fetch a user snapshot.
    pub fn get(&self, id: &UserId) -> Option<BillingUser> {
        self.rows
            .read()
            .ok()?
            .iter()
            .find(|u| &u.id == id)
            .cloned()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUsers {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<BillingUser>, DomainError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|u| &u.id == id)
            .cloned())
    }

    async fn find_by_card_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<BillingUser>, DomainError> {
        Ok(self
            .rows
            .read()
            .map_err(poisoned)?
            .iter()
            .find(|u| u.card_customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn set_card_customer_id(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), DomainError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        match rows.iter_mut().find(|u| &u.id == user_id) {
            Some(user) => {
                user.card_customer_id = Some(customer_id.to_string());
                Ok(())
            }
            None => Err(DomainError::new(ErrorCode::UserNotFound, "User not found")),
        }
    }

    async fn mirror_subscription(
        &self,
        user_id: &UserId,
        status: Option<SubscriptionStatus>,
        current_product: Option<ProductId>,
    ) -> Result<(), DomainError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        match rows.iter_mut().find(|u| &u.id == user_id) {
            Some(user) => {
                user.subscription_status = status;
                user.current_product = current_product;
                Ok(())
            }
            None => Err(DomainError::new(ErrorCode::UserNotFound, "User not found")),
        }
    }

    async fn set_subscription_status(
        &self,
        user_id: &UserId,
        status: SubscriptionStatus,
    ) -> Result<(), DomainError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        match rows.iter_mut().find(|u| &u.id == user_id) {
            Some(user) => {
                user.subscription_status = Some(status);
                Ok(())
            }
            None => Err(DomainError::new(ErrorCode::UserNotFound, "User not found")),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Processed webhook events
// ════════════════════════════════════════════════════════════════════════════

/// In-memory processed-event store.
#[derive(Default)]
pub struct InMemoryWebhookEvents {
    records: RwLock<HashMap<String, WebhookEventRecord>>,
}

impl InMemoryWebhookEvents {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryWebhookEvents {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        Ok(self
            .records
            .read()
            .map_err(poisoned)?
            .get(event_id)
            .cloned())
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        let mut records = self.records.write().map_err(poisoned)?;
        if records.contains_key(&record.event_id) {
            Ok(SaveResult::AlreadyExists)
        } else {
            records.insert(record.event_id.clone(), record);
            Ok(SaveResult::Inserted)
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Notifier
// ════════════════════════════════════════════════════════════════════════════

/// Notifier that records reminders instead of delivering anything.
#[derive(Default)]
pub struct RecordingNotifier {
    notified: RwLock<Vec<RenewalReminder>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: reminders handed off so far.
    pub fn notified(&self) -> Vec<RenewalReminder> {
        self.notified.read().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RenewalNotifier for RecordingNotifier {
    async fn notify(&self, reminder: &RenewalReminder) -> Result<(), DomainError> {
        self.notified
            .write()
            .map_err(poisoned)?
            .push(reminder.clone());
        Ok(())
    }
}
