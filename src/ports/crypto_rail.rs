//! Crypto rail port - the capability interface for the cryptocurrency
//! payment gateway.
//!
//! The gateway has no native recurring billing; every charge is a single
//! payment. Amounts cross this boundary in minor units and are converted to
//! the gateway's decimal-string major units inside the adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::card_rail::RailError;
use crate::domain::billing::PaymentIntentStatus;

/// Request to create a crypto payment.
#[derive(Debug, Clone)]
pub struct CreateCryptoPayment {
    /// Amount in minor currency units; the adapter formats major units.
    pub amount: i64,
    /// Product currency. The gateway settles in a fixed currency
    /// regardless (documented provider limitation).
    pub currency: String,
    /// Caller-generated, globally unique order id.
    pub order_id: String,
    pub return_url: Option<String>,
    pub success_url: Option<String>,
    pub callback_url: Option<String>,
}

/// A created or polled crypto payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CryptoPayment {
    /// Provider-assigned payment uuid.
    pub uuid: String,
    pub order_id: String,
    /// Hosted payment page URL.
    pub url: String,
    pub status: PaymentIntentStatus,
    /// Invoiced amount, decimal string of major units.
    pub amount: String,
    #[serde(default)]
    pub payer_currency: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
}

/// Port for the cryptocurrency payment gateway.
#[async_trait]
pub trait CryptoRail: Send + Sync {
    /// Create a single payment and return its hosted payment page.
    async fn create_payment(
        &self,
        request: CreateCryptoPayment,
    ) -> Result<CryptoPayment, RailError>;

    /// Poll the current status of a payment by uuid.
    async fn payment_status(&self, uuid: &str) -> Result<CryptoPayment, RailError>;
}
