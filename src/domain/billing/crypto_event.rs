//! Crypto-rail webhook payload.
//!
//! The crypto rail delivers a single webhook shape for every payment state
//! change, authenticated by the embedded `sign` field (see
//! [`super::signing::CryptoSigner`]).

use serde::{Deserialize, Serialize};

use super::payment_intent::PaymentIntentStatus;

/// Inbound crypto-rail webhook.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CryptoWebhook {
    /// Provider payment uuid; the reconciliation key.
    pub uuid: String,
    pub order_id: String,
    /// Invoiced amount, decimal string of major units.
    pub amount: String,
    pub payment_status: PaymentIntentStatus,
    /// What the payer actually sent, in their currency.
    #[serde(default)]
    pub payer_amount: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payer_currency: Option<String>,
    #[serde(default)]
    pub additional_data: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Embedded signature; excluded from the signing input.
    pub sign: String,
}

impl CryptoWebhook {
    pub fn is_paid(&self) -> bool {
        self.payment_status.is_paid()
    }
}
