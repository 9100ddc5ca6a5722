//! Product entity - a purchasable item mirrored from the content store.
//!
//! Products come in two kinds: one-time purchases and recurring
//! subscriptions. Prices are integer minor-currency units (cents).
//! Card-rail mirror ids are created lazily the first time a product is
//! checked out on that rail.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ProductId, Timestamp, ValidationError};

/// How a product is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    /// Single payment, no recurrence.
    OneTime,
    /// Recurring billing on a fixed interval.
    Subscription,
}

impl ProductKind {
    /// The wire string used in order ids and session metadata.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::OneTime => "one_time",
            ProductKind::Subscription => "subscription",
        }
    }

    /// Parse from the wire string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "one_time" => Some(ProductKind::OneTime),
            "subscription" => Some(ProductKind::Subscription),
            _ => None,
        }
    }
}

/// Billing interval for subscription products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Month,
    Year,
}

impl BillingInterval {
    /// Period length in days.
    ///
    /// The crypto rail has no native recurrence, so periods are tracked
    /// manually: a year is 365 days, anything else 30.
    pub fn period_days(&self) -> i64 {
        match self {
            BillingInterval::Year => 365,
            BillingInterval::Month => 30,
        }
    }

    /// The interval string understood by the card rail's price API.
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Month => "month",
            BillingInterval::Year => "year",
        }
    }
}

/// A purchasable product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub kind: ProductKind,
    /// Price in minor currency units (e.g. cents).
    pub price: i64,
    /// ISO currency code, carried opaquely.
    pub currency: String,
    /// Present iff `kind == Subscription`.
    pub interval: Option<BillingInterval>,
    /// Card-rail product mirror, created lazily.
    pub card_product_id: Option<String>,
    /// Card-rail price mirror, created lazily.
    pub card_price_id: Option<String>,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Product {
    /// Creates a product, enforcing the price and interval invariants.
    ///
    /// # Errors
    ///
    /// - price must be >= 0
    /// - interval must be present exactly when the product is a subscription
    pub fn try_new(
        id: ProductId,
        name: impl Into<String>,
        kind: ProductKind,
        price: i64,
        currency: impl Into<String>,
        interval: Option<BillingInterval>,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if price < 0 {
            return Err(ValidationError::out_of_range("price", 0, i64::MAX, price));
        }
        match (kind, interval) {
            (ProductKind::Subscription, None) => {
                return Err(ValidationError::invalid_format(
                    "interval",
                    "subscription products require a billing interval",
                ));
            }
            (ProductKind::OneTime, Some(_)) => {
                return Err(ValidationError::invalid_format(
                    "interval",
                    "one-time products cannot have a billing interval",
                ));
            }
            _ => {}
        }

        let now = Timestamp::now();
        Ok(Self {
            id,
            name,
            description: None,
            kind,
            price,
            currency: currency.into(),
            interval,
            card_product_id: None,
            card_price_id: None,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns true when both card-rail mirror ids are present.
    pub fn has_card_mirror(&self) -> bool {
        self.card_product_id.is_some() && self.card_price_id.is_some()
    }

    /// Records the card-rail mirror ids after lazy creation.
    pub fn set_card_mirror(&mut self, product_id: impl Into<String>, price_id: impl Into<String>) {
        self.card_product_id = Some(product_id.into());
        self.card_price_id = Some(price_id.into());
        self.updated_at = Timestamp::now();
    }

    /// Period length in days for subscription products (30 for one-time,
    /// which never reaches period arithmetic in practice).
    pub fn period_days(&self) -> i64 {
        self.interval.map(|i| i.period_days()).unwrap_or(30)
    }

    /// Whether this is a monthly subscription, the case that requires
    /// prepaid emulation on the crypto rail.
    pub fn is_monthly_subscription(&self) -> bool {
        self.kind == ProductKind::Subscription && self.interval == Some(BillingInterval::Month)
    }
}
