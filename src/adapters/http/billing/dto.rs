//! Request/response DTOs for the billing API.
//!
//! Wire names are camelCase; conversions into domain types happen here so
//! handlers work with typed values only.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::{
    BillingOverview, CheckoutOutcome, CouponValidation, ExpiringSubscription, RenewalPayment,
    SweepReport,
};
use crate::domain::billing::{Product, Subscription};
use crate::ports::CryptoPayment;

/// Error body: `{ "error": "..." }` with the status carrying the taxonomy.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Checkout
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub product_id: String,
    pub price_type: String,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_prepaid: bool,
}

impl From<CheckoutOutcome> for CheckoutResponse {
    fn from(outcome: CheckoutOutcome) -> Self {
        Self {
            url: outcome.url,
            session_id: outcome.session_id,
            payment_id: outcome.payment_id,
            order_id: outcome.order_id,
            is_prepaid: outcome.is_prepaid,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Coupons
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    pub code: String,
    #[serde(default)]
    pub product_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<DiscountResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: i64,
    pub display_text: String,
}

impl From<CouponValidation> for ValidateCouponResponse {
    fn from(validation: CouponValidation) -> Self {
        Self {
            valid: validation.valid,
            discount: validation.discount.map(|d| DiscountResponse {
                kind: match d.kind {
                    crate::domain::billing::DiscountKind::Percentage => "percentage".to_string(),
                    crate::domain::billing::DiscountKind::Fixed => "fixed".to_string(),
                },
                value: d.value,
                display_text: d.display_text,
            }),
            error: validation.error,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Subscription management
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalRequest {
    #[serde(default)]
    pub return_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PortalResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionActionRequest {
    pub subscription_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequest {
    pub current_subscription_id: String,
    pub new_product_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub id: String,
    pub status: String,
    pub cancel_at_period_end: bool,
    pub current_period_end: String,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(subscription: Subscription) -> Self {
        Self {
            id: subscription.id.to_string(),
            status: subscription.status.as_str().to_string(),
            cancel_at_period_end: subscription.cancel_at_period_end,
            current_period_end: subscription.current_period_end.to_string(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Renewal / expiring
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewRequest {
    pub subscription_id: String,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewResponse {
    pub payment_id: String,
    pub url: String,
    pub order_id: String,
}

impl From<RenewalPayment> for RenewResponse {
    fn from(payment: RenewalPayment) -> Self {
        Self {
            payment_id: payment.payment_id,
            url: payment.url,
            order_id: payment.order_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExpiringResponse {
    pub subscriptions: Vec<ExpiringSubscriptionResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringSubscriptionResponse {
    pub id: String,
    pub product: ExpiringProductResponse,
    pub current_period_end: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ExpiringProductResponse {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub currency: String,
}

impl From<ExpiringSubscription> for ExpiringSubscriptionResponse {
    fn from(expiring: ExpiringSubscription) -> Self {
        Self {
            id: expiring.subscription.id.to_string(),
            product: ExpiringProductResponse {
                id: expiring.product.id.to_string(),
                name: expiring.product.name,
                price: expiring.product.price,
                currency: expiring.product.currency,
            },
            current_period_end: expiring.subscription.current_period_end.to_string(),
            status: expiring.subscription.status.as_str().to_string(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Overview / payments / maintenance
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    pub products: Vec<ProductResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_subscription: Option<SubscriptionResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: i64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name,
            description: product.description,
            kind: product.kind.as_str().to_string(),
            price: product.price,
            currency: product.currency,
            interval: product.interval.map(|i| i.as_str().to_string()),
        }
    }
}

impl From<BillingOverview> for OverviewResponse {
    fn from(overview: BillingOverview) -> Self {
        Self {
            products: overview.products.into_iter().map(Into::into).collect(),
            current_subscription: overview.current_subscription.map(Into::into),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoPaymentResponse {
    pub uuid: String,
    pub order_id: String,
    pub status: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

impl From<CryptoPayment> for CryptoPaymentResponse {
    fn from(payment: CryptoPayment) -> Self {
        Self {
            uuid: payment.uuid,
            order_id: payment.order_id,
            status: payment.status.as_str().to_string(),
            amount: payment.amount,
            payer_currency: payment.payer_currency,
            network: payment.network,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub checked: usize,
    pub expired: usize,
    pub reminders_checked: usize,
    pub reminders_sent: usize,
    pub errors: Vec<String>,
}

impl From<SweepReport> for SweepResponse {
    fn from(report: SweepReport) -> Self {
        Self {
            checked: report.subscriptions_checked,
            expired: report.expired,
            reminders_checked: report.reminders_checked,
            reminders_sent: report.reminders_sent,
            errors: report.errors,
        }
    }
}
