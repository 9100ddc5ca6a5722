//! Purchase entity - an immutable record of a completed one-time sale.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ProductId, PurchaseId, Timestamp, UserId};

/// Purchase settlement status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// A one-time purchase. Immutable after creation in the normal flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub user_id: UserId,
    pub product_id: ProductId,
    /// Card payment reference, or a synthetic `cryptomus_*` / `free_*` id.
    pub provider_payment_id: String,
    /// Amount actually charged, minor units (0 for promotional purchases).
    pub amount: i64,
    pub currency: String,
    pub status: PurchaseStatus,
    pub purchased_at: Timestamp,
    pub created_at: Timestamp,
}

impl Purchase {
    /// Records a completed purchase.
    pub fn completed(
        user_id: UserId,
        product_id: ProductId,
        provider_payment_id: impl Into<String>,
        amount: i64,
        currency: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: PurchaseId::new(),
            user_id,
            product_id,
            provider_payment_id: provider_payment_id.into(),
            amount,
            currency: currency.into(),
            status: PurchaseStatus::Completed,
            purchased_at: now,
            created_at: now,
        }
    }

    /// Records a free purchase granted by a 100%-off coupon. The marker
    /// prefix depends on which rail the checkout came through.
    pub fn promotional(
        user_id: UserId,
        product_id: ProductId,
        crypto_checkout: bool,
        now: Timestamp,
    ) -> Self {
        let prefix = if crypto_checkout { "free_crypto" } else { "free" };
        Self::completed(
            user_id,
            product_id,
            format!("{}_{}", prefix, now.as_unix_millis()),
            0,
            "usd",
            now,
        )
    }
}
