//! Crypto-rail adapter over the gateway's signed JSON API.
//!
//! Every request body is canonicalized and signed by the
//! [`CryptoSigner`]; the signature travels in the `sign` header next to
//! the `merchant` id. Responses wrap the payload in an envelope whose
//! `state` field is zero on success.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::domain::billing::{CryptoSigner, PaymentIntentStatus};
use crate::ports::{CreateCryptoPayment, CryptoPayment, CryptoRail, RailError, RailErrorCode};

/// Payment lifetime in seconds for hosted invoices.
const PAYMENT_LIFETIME_SECS: u32 = 3600;

/// The gateway settles in USD regardless of the product currency
/// (documented provider limitation).
const SETTLEMENT_CURRENCY: &str = "USD";

/// Crypto rail API configuration.
#[derive(Clone)]
pub struct CryptomusConfig {
    api_base_url: String,
}

impl CryptomusConfig {
    pub fn new() -> Self {
        Self {
            api_base_url: "https://api.cryptomus.com/v1".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

impl Default for CryptomusConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Envelope wrapping every gateway response.
#[derive(Debug, Deserialize)]
struct CryptomusEnvelope {
    state: i64,
    #[serde(default)]
    message: Option<String>,
    result: Option<CryptomusPayment>,
}

/// Payment resource as the gateway returns it.
#[derive(Debug, Clone, Deserialize)]
struct CryptomusPayment {
    uuid: String,
    order_id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
    #[serde(default)]
    status: Option<String>,
    amount: String,
    #[serde(default)]
    payer_currency: Option<String>,
    #[serde(default)]
    network: Option<String>,
}

impl CryptomusPayment {
    fn into_payment(self) -> CryptoPayment {
        let status = self
            .payment_status
            .as_deref()
            .or(self.status.as_deref())
            .map(parse_status)
            .unwrap_or(PaymentIntentStatus::Pending);
        CryptoPayment {
            uuid: self.uuid,
            order_id: self.order_id,
            url: self.url.unwrap_or_default(),
            status,
            amount: self.amount,
            payer_currency: self.payer_currency,
            network: self.network,
        }
    }
}

/// Maps gateway status strings onto the intent vocabulary. Stages the
/// gateway emits before the payer acts (e.g. "check") read as pending.
fn parse_status(s: &str) -> PaymentIntentStatus {
    match s {
        "paid" | "paid_over" => PaymentIntentStatus::Paid,
        "fail" | "cancel" | "system_fail" => PaymentIntentStatus::Fail,
        "wrong_amount" | "wrong_amount_waiting" => PaymentIntentStatus::WrongAmount,
        "process" => PaymentIntentStatus::Process,
        "confirm_check" | "confirmations" => PaymentIntentStatus::ConfirmCheck,
        _ => PaymentIntentStatus::Pending,
    }
}

/// Formats minor units as the gateway's decimal-string major units.
fn format_major_units(amount: i64) -> String {
    format!("{}.{:02}", amount / 100, amount % 100)
}

/// Crypto-rail adapter.
pub struct CryptomusAdapter {
    config: CryptomusConfig,
    signer: CryptoSigner,
    http_client: reqwest::Client,
}

impl CryptomusAdapter {
    pub fn new(config: CryptomusConfig, signer: CryptoSigner) -> Self {
        Self {
            config,
            signer,
            http_client: reqwest::Client::new(),
        }
    }

    async fn post_signed(&self, path: &str, payload: Map<String, Value>) -> Result<CryptoPayment, RailError> {
        let (body, sign) = self.signer.sign_request(&payload);
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("merchant", self.signer.merchant_id())
            .header("sign", sign)
            .body(body)
            .send()
            .await
            .map_err(|e| RailError::network(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
                .unwrap_or_else(|| "Invalid Sign".to_string());
            tracing::error!(path = %path, status = %status, body = %text, "crypto rail request failed");
            return Err(RailError::new(
                RailErrorCode::Provider,
                format!("crypto rail error: {} - {}", status, message),
            ));
        }

        let envelope: CryptomusEnvelope = serde_json::from_str(&text).map_err(|e| {
            RailError::new(
                RailErrorCode::Provider,
                format!("failed to parse crypto rail response: {}", e),
            )
        })?;

        if envelope.state != 0 {
            let message = envelope
                .message
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(RailError::new(
                RailErrorCode::Provider,
                format!("crypto rail rejected the request: {}", message),
            ));
        }

        envelope
            .result
            .map(CryptomusPayment::into_payment)
            .ok_or_else(|| {
                RailError::new(RailErrorCode::Provider, "crypto rail response has no result")
            })
    }
}

#[async_trait]
impl CryptoRail for CryptomusAdapter {
    async fn create_payment(
        &self,
        request: CreateCryptoPayment,
    ) -> Result<CryptoPayment, RailError> {
        let mut payload = Map::new();
        payload.insert("amount".into(), json!(format_major_units(request.amount)));
        payload.insert("currency".into(), json!(SETTLEMENT_CURRENCY));
        payload.insert("order_id".into(), json!(request.order_id));
        payload.insert("is_payment_multiple".into(), json!(false));
        payload.insert("lifetime".into(), json!(PAYMENT_LIFETIME_SECS));
        if let Some(url) = request.return_url {
            payload.insert("url_return".into(), json!(url));
        }
        if let Some(url) = request.success_url {
            payload.insert("url_success".into(), json!(url));
        }
        if let Some(url) = request.callback_url {
            payload.insert("url_callback".into(), json!(url));
        }
        payload.insert("merchant_id".into(), json!(self.signer.merchant_id()));

        self.post_signed("/payment", payload).await
    }

    async fn payment_status(&self, uuid: &str) -> Result<CryptoPayment, RailError> {
        let mut payload = Map::new();
        payload.insert("uuid".into(), json!(uuid));
        payload.insert("merchant_id".into(), json!(self.signer.merchant_id()));

        self.post_signed("/payment/info", payload).await
    }
}
