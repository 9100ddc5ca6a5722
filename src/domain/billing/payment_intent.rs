//! Payment intent - the crypto rail's durable pending-payment record.
//!
//! Created before the provider confirms payment and mutated exactly once
//! by the webhook reconciler. The card rail keeps its equivalent state
//! provider-side, so only crypto payments are recorded here. Intents are
//! never deleted.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    PaymentIntentId, ProductId, SubscriptionId, Timestamp, UserId,
};

/// What a crypto payment pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    OneTime,
    /// Yearly subscription charged as a single payment.
    Subscription,
    /// Monthly subscription emulated by charging once per period.
    PrepaidSubscription,
    /// A payment extending an existing prepaid subscription.
    SubscriptionRenewal,
}

impl PaymentKind {
    /// The order-id prefix for this kind.
    pub fn order_prefix(&self) -> &'static str {
        match self {
            PaymentKind::OneTime => "one_time",
            PaymentKind::Subscription => "subscription",
            PaymentKind::PrepaidSubscription => "prepaid_sub",
            PaymentKind::SubscriptionRenewal => "renewal",
        }
    }
}

/// Provider-reported payment status.
///
/// Mirrors the crypto rail's webhook vocabulary verbatim so status updates
/// are a straight copy, not a translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    Pending,
    Paid,
    Fail,
    WrongAmount,
    Process,
    ConfirmCheck,
}

impl PaymentIntentStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentIntentStatus::Paid)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentIntentStatus::Pending => "pending",
            PaymentIntentStatus::Paid => "paid",
            PaymentIntentStatus::Fail => "fail",
            PaymentIntentStatus::WrongAmount => "wrong_amount",
            PaymentIntentStatus::Process => "process",
            PaymentIntentStatus::ConfirmCheck => "confirm_check",
        }
    }
}

/// A pending or settled crypto payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: PaymentIntentId,
    pub user_id: UserId,
    pub product_id: ProductId,
    /// Provider-assigned payment uuid; the webhook reconciliation key.
    pub provider_uuid: String,
    /// Caller-generated order id embedding kind, product, user and a
    /// millisecond timestamp.
    pub order_id: String,
    /// Final amount after discounts, minor units.
    pub amount: i64,
    pub currency: String,
    pub kind: PaymentKind,
    pub status: PaymentIntentStatus,
    /// Hosted payment page the user is redirected to.
    pub payment_url: String,
    pub coupon_code: Option<String>,
    /// Only set for `SubscriptionRenewal` payments.
    pub related_subscription: Option<SubscriptionId>,
    pub paid_at: Option<Timestamp>,
    /// Settlement details mirrored from the webhook on `paid`.
    pub payer_currency: Option<String>,
    pub payer_amount: Option<String>,
    pub network: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PaymentIntent {
    /// Creates a pending intent at checkout time.
    #[allow(clippy::too_many_arguments)]
    pub fn pending(
        user_id: UserId,
        product_id: ProductId,
        provider_uuid: impl Into<String>,
        order_id: impl Into<String>,
        amount: i64,
        currency: impl Into<String>,
        kind: PaymentKind,
        payment_url: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: PaymentIntentId::new(),
            user_id,
            product_id,
            provider_uuid: provider_uuid.into(),
            order_id: order_id.into(),
            amount,
            currency: currency.into(),
            kind,
            status: PaymentIntentStatus::Pending,
            payment_url: payment_url.into(),
            coupon_code: None,
            related_subscription: None,
            paid_at: None,
            payer_currency: None,
            payer_amount: None,
            network: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attaches the coupon code that produced the discounted amount.
    pub fn with_coupon(mut self, code: impl Into<String>) -> Self {
        self.coupon_code = Some(code.into());
        self
    }

    /// Links a renewal payment back to the subscription it extends.
    pub fn for_subscription(mut self, subscription_id: SubscriptionId) -> Self {
        self.related_subscription = Some(subscription_id);
        self
    }

    /// Applies a status reported by the provider webhook. `paid_at` is set
    /// only on the transition to paid.
    pub fn apply_status(&mut self, status: PaymentIntentStatus, now: Timestamp) {
        self.status = status;
        if status.is_paid() && self.paid_at.is_none() {
            self.paid_at = Some(now);
        }
        self.updated_at = now;
    }

    /// Mirrors settlement details from a paid webhook.
    pub fn record_settlement(
        &mut self,
        payer_currency: impl Into<String>,
        payer_amount: impl Into<String>,
        network: impl Into<String>,
    ) {
        self.payer_currency = Some(payer_currency.into());
        self.payer_amount = Some(payer_amount.into());
        self.network = Some(network.into());
    }
}

/// Builds a caller-generated order id: `{prefix}_{product}_{user}_{millis}`.
pub fn order_id(kind: PaymentKind, product_id: ProductId, user_id: UserId, now: Timestamp) -> String {
    format!(
        "{}_{}_{}_{}",
        kind.order_prefix(),
        product_id,
        user_id,
        now.as_unix_millis()
    )
}

/// Builds a renewal order id: `renewal_{subscription}_{millis}`.
pub fn renewal_order_id(subscription_id: SubscriptionId, now: Timestamp) -> String {
    format!("renewal_{}_{}", subscription_id, now.as_unix_millis())
}
