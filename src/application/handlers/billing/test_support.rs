//! Shared mock rails for handler tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;

use crate::domain::billing::{Coupon, PaymentIntentStatus, Product};
use crate::domain::foundation::UserId;
use crate::ports::{
    CardCheckoutSession, CardRail, CreateCardCheckout, CreateCryptoPayment, CryptoPayment,
    CryptoRail, ProductMirror, ProrationPolicy, RailError,
};

/// Card rail mock that fabricates ids and records every call.
pub struct MockCardRail {
    customers: AtomicU32,
    sessions: RwLock<Vec<CreateCardCheckout>>,
    canceled: RwLock<Vec<String>>,
    reactivated: RwLock<Vec<String>>,
    item_changes: RwLock<Vec<(String, String)>>,
    fail_next: Mutex<Option<String>>,
}

impl MockCardRail {
    pub fn new() -> Self {
        Self {
            customers: AtomicU32::new(0),
            sessions: RwLock::new(Vec::new()),
            canceled: RwLock::new(Vec::new()),
            reactivated: RwLock::new(Vec::new()),
            item_changes: RwLock::new(Vec::new()),
            fail_next: Mutex::new(None),
        }
    }

    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }

    fn take_failure(&self) -> Result<(), RailError> {
        match self.fail_next.lock().unwrap().take() {
            Some(message) => Err(RailError::provider(message)),
            None => Ok(()),
        }
    }

    pub fn customers_created(&self) -> u32 {
        self.customers.load(Ordering::SeqCst)
    }

    pub fn sessions(&self) -> Vec<CreateCardCheckout> {
        self.sessions.read().unwrap().clone()
    }

    pub fn canceled(&self) -> Vec<String> {
        self.canceled.read().unwrap().clone()
    }

    pub fn reactivated(&self) -> Vec<String> {
        self.reactivated.read().unwrap().clone()
    }

    pub fn item_changes(&self) -> Vec<(String, String)> {
        self.item_changes.read().unwrap().clone()
    }
}

impl Default for MockCardRail {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CardRail for MockCardRail {
    async fn create_customer(
        &self,
        _user_id: &UserId,
        _email: &str,
        _name: Option<&str>,
    ) -> Result<String, RailError> {
        self.take_failure()?;
        let n = self.customers.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("cus_mock_{}", n))
    }

    async fn create_checkout_session(
        &self,
        request: CreateCardCheckout,
    ) -> Result<CardCheckoutSession, RailError> {
        self.take_failure()?;
        let n = {
            let mut sessions = self.sessions.write().unwrap();
            sessions.push(request);
            sessions.len()
        };
        Ok(CardCheckoutSession {
            id: format!("cs_mock_{}", n),
            url: format!("https://checkout.example/session/{}", n),
        })
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        _return_url: &str,
    ) -> Result<String, RailError> {
        self.take_failure()?;
        Ok(format!("https://portal.example/{}", customer_id))
    }

    async fn cancel_at_period_end(&self, subscription_id: &str) -> Result<(), RailError> {
        self.take_failure()?;
        self.canceled.write().unwrap().push(subscription_id.to_string());
        Ok(())
    }

    async fn reactivate(&self, subscription_id: &str) -> Result<(), RailError> {
        self.take_failure()?;
        self.reactivated
            .write()
            .unwrap()
            .push(subscription_id.to_string());
        Ok(())
    }

    async fn change_subscription_item(
        &self,
        subscription_id: &str,
        new_price_id: &str,
        _proration: ProrationPolicy,
    ) -> Result<(), RailError> {
        self.take_failure()?;
        self.item_changes
            .write()
            .unwrap()
            .push((subscription_id.to_string(), new_price_id.to_string()));
        Ok(())
    }

    async fn ensure_product_mirror(&self, product: &Product) -> Result<ProductMirror, RailError> {
        self.take_failure()?;
        Ok(ProductMirror {
            product_id: product
                .card_product_id
                .clone()
                .unwrap_or_else(|| format!("prod_mock_{}", product.id)),
            price_id: product
                .card_price_id
                .clone()
                .unwrap_or_else(|| format!("price_mock_{}", product.id)),
        })
    }

    async fn ensure_coupon_mirror(&self, coupon: &Coupon) -> Result<String, RailError> {
        self.take_failure()?;
        Ok(coupon
            .card_coupon_id
            .clone()
            .unwrap_or_else(|| format!("coup_mock_{}", coupon.code)))
    }
}

/// Crypto rail mock with sequential uuids.
pub struct MockCryptoRail {
    created: RwLock<Vec<CreateCryptoPayment>>,
    fail_next: Mutex<Option<String>>,
}

impl MockCryptoRail {
    pub fn new() -> Self {
        Self {
            created: RwLock::new(Vec::new()),
            fail_next: Mutex::new(None),
        }
    }

    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }

    pub fn created(&self) -> Vec<CreateCryptoPayment> {
        self.created.read().unwrap().clone()
    }
}

impl Default for MockCryptoRail {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CryptoRail for MockCryptoRail {
    async fn create_payment(
        &self,
        request: CreateCryptoPayment,
    ) -> Result<CryptoPayment, RailError> {
        if let Some(message) = self.fail_next.lock().unwrap().take() {
            return Err(RailError::provider(message));
        }
        let (n, order_id, amount) = {
            let mut created = self.created.write().unwrap();
            created.push(request.clone());
            (created.len(), request.order_id, request.amount)
        };
        Ok(CryptoPayment {
            uuid: format!("uuid-mock-{}", n),
            order_id,
            url: format!("https://pay.example/invoice/{}", n),
            status: PaymentIntentStatus::ConfirmCheck,
            amount: format!("{}.{:02}", amount / 100, amount % 100),
            payer_currency: None,
            network: None,
        })
    }

    async fn payment_status(&self, uuid: &str) -> Result<CryptoPayment, RailError> {
        if let Some(message) = self.fail_next.lock().unwrap().take() {
            return Err(RailError::provider(message));
        }
        Ok(CryptoPayment {
            uuid: uuid.to_string(),
            order_id: "order".to_string(),
            url: "https://pay.example/invoice/unknown".to_string(),
            status: PaymentIntentStatus::Process,
            amount: "0.00".to_string(),
            payer_currency: None,
            network: None,
        })
    }
}
