//! Coupon entity and discount arithmetic.
//!
//! Coupons are looked up by case-insensitive code (stored uppercased) and
//! reduce a product's price either by a percentage or by a fixed amount of
//! minor currency units. Expiry and usage caps are rejected at validation
//! time, never silently clamped.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CouponId, ProductId, Timestamp, ValidationError};

use super::product::ProductKind;

/// The kind of price reduction a coupon applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// Value is a percentage in 0..=100.
    Percentage,
    /// Value is an absolute amount of minor currency units.
    Fixed,
}

/// Which products a coupon may be applied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "products")]
pub enum CouponScope {
    /// Applies to every product.
    All,
    /// Applies only to the listed products.
    Specific(Vec<ProductId>),
    /// Applies only to subscription products.
    SubscriptionsOnly,
    /// Applies only to one-time products.
    OneTimeOnly,
}

/// A discount coupon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    /// Unique code, normalized to uppercase.
    pub code: String,
    /// Internal display name.
    pub name: String,
    pub kind: DiscountKind,
    /// Percentage (0..=100) or minor-unit amount depending on `kind`.
    pub value: i64,
    /// None means unlimited.
    pub max_uses: Option<u32>,
    /// Monotonically non-decreasing usage counter.
    pub current_uses: u32,
    /// None means no expiry.
    pub expires_at: Option<Timestamp>,
    pub scope: CouponScope,
    pub active: bool,
    /// Card-rail coupon mirror, created lazily when the coupon is first
    /// attached to a checkout session.
    pub card_coupon_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Coupon {
    /// Creates a coupon, normalizing the code and validating the value range.
    pub fn try_new(
        id: CouponId,
        code: impl Into<String>,
        name: impl Into<String>,
        kind: DiscountKind,
        value: i64,
        scope: CouponScope,
    ) -> Result<Self, ValidationError> {
        let code = code.into();
        if code.is_empty() {
            return Err(ValidationError::empty_field("code"));
        }
        match kind {
            DiscountKind::Percentage if !(0..=100).contains(&value) => {
                return Err(ValidationError::out_of_range("value", 0, 100, value));
            }
            DiscountKind::Fixed if value < 0 => {
                return Err(ValidationError::out_of_range("value", 0, i64::MAX, value));
            }
            _ => {}
        }

        let now = Timestamp::now();
        Ok(Self {
            id,
            code: code.to_uppercase(),
            name: name.into(),
            kind,
            value,
            max_uses: None,
            current_uses: 0,
            expires_at: None,
            scope,
            active: true,
            card_coupon_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Limits the coupon to a maximum number of redemptions.
    pub fn with_max_uses(mut self, max_uses: u32) -> Self {
        self.max_uses = Some(max_uses);
        self
    }

    /// Sets an expiry timestamp.
    pub fn with_expiry(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// True when the coupon's expiry has passed at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        matches!(self.expires_at, Some(at) if at.is_before(&now))
    }

    /// True when the usage cap is set and reached.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.max_uses, Some(max) if self.current_uses >= max)
    }

    /// True for a 100%-off percentage coupon, the special case that
    /// short-circuits checkout without contacting a payment rail.
    pub fn is_full_discount(&self) -> bool {
        self.kind == DiscountKind::Percentage && self.value == 100
    }

    /// Checks whether this coupon can be used for a product of the given
    /// id and kind. Returns the rejection reason on mismatch.
    pub fn check_scope(&self, product_id: ProductId, kind: ProductKind) -> Result<(), ScopeError> {
        match &self.scope {
            CouponScope::All => Ok(()),
            CouponScope::Specific(products) => {
                if products.contains(&product_id) {
                    Ok(())
                } else {
                    Err(ScopeError::NotInProductSet)
                }
            }
            CouponScope::SubscriptionsOnly => {
                if kind == ProductKind::Subscription {
                    Ok(())
                } else {
                    Err(ScopeError::SubscriptionsOnly)
                }
            }
            CouponScope::OneTimeOnly => {
                if kind == ProductKind::OneTime {
                    Ok(())
                } else {
                    Err(ScopeError::OneTimeOnly)
                }
            }
        }
    }

    /// Applies the discount to a price in minor units.
    ///
    /// Percentage discounts round to the nearest unit; fixed discounts
    /// floor at zero. The result is always in `0..=price`.
    pub fn apply_discount(&self, price: i64) -> i64 {
        match self.kind {
            DiscountKind::Percentage => {
                (price as f64 * (1.0 - self.value as f64 / 100.0)).round() as i64
            }
            DiscountKind::Fixed => (price - self.value).max(0),
        }
    }

    /// Human-readable discount description for price previews.
    pub fn display_text(&self) -> String {
        match self.kind {
            DiscountKind::Percentage => format!("{}% off", self.value),
            DiscountKind::Fixed => {
                format!("${}.{:02} off", self.value / 100, self.value % 100)
            }
        }
    }

    /// Records one redemption.
    pub fn record_use(&mut self) {
        self.current_uses += 1;
        self.updated_at = Timestamp::now();
    }
}

/// Why a coupon's scope rejected a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
    NotInProductSet,
    SubscriptionsOnly,
    OneTimeOnly,
}

impl ScopeError {
    /// User-facing rejection message.
    pub fn message(&self) -> &'static str {
        match self {
            ScopeError::NotInProductSet => "Coupon not applicable to this product",
            ScopeError::SubscriptionsOnly => "Coupon only applies to subscription products",
            ScopeError::OneTimeOnly => "Coupon only applies to one-time products",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn percentage(value: i64) -> Coupon {
        Coupon::try_new(
            CouponId::new(),
            "SAVE",
            "Save",
            DiscountKind::Percentage,
            value,
            CouponScope::All,
        )
        .unwrap()
    }

    fn fixed(value: i64) -> Coupon {
        Coupon::try_new(
            CouponId::new(),
            "OFF",
            "Off",
            DiscountKind::Fixed,
            value,
            CouponScope::All,
        )
        .unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Construction
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn code_is_normalized_to_uppercase() {
        let coupon = Coupon::try_new(
            CouponId::new(),
            "save20",
            "Save 20",
            DiscountKind::Percentage,
            20,
            CouponScope::All,
        )
        .unwrap();
        assert_eq!(coupon.code, "SAVE20");
    }

    #[test]
    fn percentage_over_100_is_rejected() {
        let result = Coupon::try_new(
            CouponId::new(),
            "BAD",
            "Bad",
            DiscountKind::Percentage,
            101,
            CouponScope::All,
        );
        assert!(matches!(result, Err(ValidationError::OutOfRange { .. })));
    }

    #[test]
    fn negative_fixed_discount_is_rejected() {
        let result = Coupon::try_new(
            CouponId::new(),
            "BAD",
            "Bad",
            DiscountKind::Fixed,
            -500,
            CouponScope::All,
        );
        assert!(result.is_err());
    }

    // ══════════════════════════════════════════════════════════════
    // Discount arithmetic
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn twenty_percent_off_2000_is_1600() {
        assert_eq!(percentage(20).apply_discount(2000), 1600);
    }

    #[test]
    fn hundred_percent_off_is_zero() {
        assert_eq!(percentage(100).apply_discount(2000), 0);
    }

    #[test]
    fn percentage_rounds_to_nearest_unit() {
        // 33% off 999 = 669.33 -> 669
        assert_eq!(percentage(33).apply_discount(999), 669);
        // 15% off 990 = 841.5 -> 842
        assert_eq!(percentage(15).apply_discount(990), 842);
    }

    #[test]
    fn fixed_discount_subtracts() {
        assert_eq!(fixed(500).apply_discount(2000), 1500);
    }

    #[test]
    fn fixed_discount_floors_at_zero() {
        assert_eq!(fixed(5000).apply_discount(2000), 0);
    }

    proptest! {
        #[test]
        fn percentage_result_stays_within_bounds(price in 0i64..10_000_000, value in 0i64..=100) {
            let result = percentage(value).apply_discount(price);
            prop_assert!(result >= 0);
            prop_assert!(result <= price);
        }

        #[test]
        fn fixed_result_stays_within_bounds(price in 0i64..10_000_000, value in 0i64..10_000_000) {
            let result = fixed(value).apply_discount(price);
            prop_assert!(result >= 0);
            prop_assert!(result <= price);
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Eligibility
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn expiry_in_past_is_expired() {
        let now = Timestamp::now();
        let coupon = percentage(20).with_expiry(now.minus_days(1));
        assert!(coupon.is_expired(now));
    }

    #[test]
    fn expiry_in_future_is_not_expired() {
        let now = Timestamp::now();
        let coupon = percentage(20).with_expiry(now.add_days(1));
        assert!(!coupon.is_expired(now));
    }

    #[test]
    fn no_expiry_never_expires() {
        assert!(!percentage(20).is_expired(Timestamp::now()));
    }

    #[test]
    fn usage_cap_reached_is_exhausted() {
        let mut coupon = percentage(20).with_max_uses(2);
        assert!(!coupon.is_exhausted());
        coupon.record_use();
        coupon.record_use();
        assert!(coupon.is_exhausted());
        assert_eq!(coupon.current_uses, 2);
    }

    #[test]
    fn unlimited_coupon_is_never_exhausted() {
        let mut coupon = percentage(20);
        for _ in 0..100 {
            coupon.record_use();
        }
        assert!(!coupon.is_exhausted());
    }

    #[test]
    fn full_discount_only_for_100_percent() {
        assert!(percentage(100).is_full_discount());
        assert!(!percentage(99).is_full_discount());
        // A fixed discount never short-circuits, even if it zeroes the price.
        assert!(!fixed(1_000_000).is_full_discount());
    }

    #[test]
    fn one_time_scope_rejects_subscription_product() {
        let coupon = Coupon::try_new(
            CouponId::new(),
            "ONETIME",
            "One time only",
            DiscountKind::Percentage,
            10,
            CouponScope::OneTimeOnly,
        )
        .unwrap();
        let err = coupon
            .check_scope(ProductId::new(), ProductKind::Subscription)
            .unwrap_err();
        assert_eq!(err, ScopeError::OneTimeOnly);
    }

    #[test]
    fn subscriptions_scope_rejects_one_time_product() {
        let coupon = Coupon::try_new(
            CouponId::new(),
            "SUBS",
            "Subs only",
            DiscountKind::Percentage,
            10,
            CouponScope::SubscriptionsOnly,
        )
        .unwrap();
        assert!(coupon
            .check_scope(ProductId::new(), ProductKind::OneTime)
            .is_err());
        assert!(coupon
            .check_scope(ProductId::new(), ProductKind::Subscription)
            .is_ok());
    }

    #[test]
    fn specific_scope_checks_product_list() {
        let allowed = ProductId::new();
        let coupon = Coupon::try_new(
            CouponId::new(),
            "PICKED",
            "Specific",
            DiscountKind::Percentage,
            10,
            CouponScope::Specific(vec![allowed]),
        )
        .unwrap();
        assert!(coupon.check_scope(allowed, ProductKind::OneTime).is_ok());
        assert_eq!(
            coupon
                .check_scope(ProductId::new(), ProductKind::OneTime)
                .unwrap_err(),
            ScopeError::NotInProductSet
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Display text
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn percentage_display_text() {
        assert_eq!(percentage(20).display_text(), "20% off");
    }

    #[test]
    fn fixed_display_text_formats_currency() {
        assert_eq!(fixed(1000).display_text(), "$10.00 off");
        assert_eq!(fixed(1050).display_text(), "$10.50 off");
        assert_eq!(fixed(5).display_text(), "$0.05 off");
    }
}
