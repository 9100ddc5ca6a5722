//! ValidateCouponHandler - the discount engine's validation pipeline.
//!
//! Checks run in a fixed order and the first failure wins: lookup among
//! active coupons, expiry, usage cap, then product scope. A passing coupon
//! comes back with its discount description for price previews.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Coupon, DiscountKind};
use crate::domain::foundation::{ProductId, Timestamp};
use crate::ports::{CouponRepository, ProductRepository};

/// Outcome of coupon validation.
#[derive(Debug, Clone)]
pub struct CouponValidation {
    pub valid: bool,
    pub coupon: Option<Coupon>,
    pub discount: Option<DiscountInfo>,
    pub error: Option<String>,
}

impl CouponValidation {
    fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            coupon: None,
            discount: None,
            error: Some(reason.into()),
        }
    }

    fn valid(coupon: Coupon) -> Self {
        let discount = DiscountInfo {
            kind: coupon.kind,
            value: coupon.value,
            display_text: coupon.display_text(),
        };
        Self {
            valid: true,
            coupon: Some(coupon),
            discount: Some(discount),
            error: None,
        }
    }
}

/// Discount details for display.
#[derive(Debug, Clone)]
pub struct DiscountInfo {
    pub kind: DiscountKind,
    pub value: i64,
    pub display_text: String,
}

/// Handler validating a coupon code, optionally against a product.
pub struct ValidateCouponHandler {
    coupons: Arc<dyn CouponRepository>,
    products: Arc<dyn ProductRepository>,
}

impl ValidateCouponHandler {
    pub fn new(coupons: Arc<dyn CouponRepository>, products: Arc<dyn ProductRepository>) -> Self {
        Self { coupons, products }
    }

    /// Runs the validation pipeline. Business rejections come back inside
    /// the `CouponValidation`; only storage failures error out.
    pub async fn handle(
        &self,
        code: &str,
        product_id: Option<ProductId>,
    ) -> Result<CouponValidation, BillingError> {
        // 1. Lookup by uppercased code among active coupons.
        let Some(coupon) = self
            .coupons
            .find_active_by_code(&code.to_uppercase())
            .await?
        else {
            return Ok(CouponValidation::invalid("Coupon code not found or inactive"));
        };

        // 2. Expiry.
        if coupon.is_expired(Timestamp::now()) {
            return Ok(CouponValidation::invalid("Coupon has expired"));
        }

        // 3. Usage cap.
        if coupon.is_exhausted() {
            return Ok(CouponValidation::invalid("Coupon usage limit reached"));
        }

        // 4. Product scope, only when a product is in play.
        if let Some(product_id) = product_id {
            let Some(product) = self.products.find_by_id(&product_id).await? else {
                return Ok(CouponValidation::invalid("Product not found"));
            };
            if let Err(scope) = coupon.check_scope(product.id, product.kind) {
                return Ok(CouponValidation::invalid(scope.message()));
            }
        }

        Ok(CouponValidation::valid(coupon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryCoupons, InMemoryProducts};
    use crate::domain::billing::{BillingInterval, CouponScope, Product, ProductKind};
    use crate::domain::foundation::{CouponId, ProductId};

    fn coupon(code: &str, kind: DiscountKind, value: i64, scope: CouponScope) -> Coupon {
        Coupon::try_new(CouponId::new(), code, code, kind, value, scope).unwrap()
    }

    fn handler(
        coupons: Vec<Coupon>,
        products: Vec<Product>,
    ) -> ValidateCouponHandler {
        ValidateCouponHandler::new(
            Arc::new(InMemoryCoupons::with(coupons)),
            Arc::new(InMemoryProducts::with(products)),
        )
    }

    #[tokio::test]
    async fn unknown_code_is_rejected() {
        let handler = handler(vec![], vec![]);
        let result = handler.handle("NOPE", None).await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("Coupon code not found or inactive"));
    }

    #[tokio::test]
    async fn inactive_coupon_is_rejected() {
        let mut c = coupon("SAVE20", DiscountKind::Percentage, 20, CouponScope::All);
        c.active = false;
        let handler = handler(vec![c], vec![]);
        let result = handler.handle("SAVE20", None).await.unwrap();
        assert!(!result.valid);
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive() {
        let handler = handler(
            vec![coupon("SAVE20", DiscountKind::Percentage, 20, CouponScope::All)],
            vec![],
        );
        let result = handler.handle("save20", None).await.unwrap();
        assert!(result.valid);
    }

    #[tokio::test]
    async fn expired_coupon_is_rejected_even_with_uses_left() {
        let c = coupon("OLD", DiscountKind::Percentage, 20, CouponScope::All)
            .with_max_uses(100)
            .with_expiry(Timestamp::now().minus_days(1));
        let handler = handler(vec![c], vec![]);
        let result = handler.handle("OLD", None).await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("Coupon has expired"));
    }

    #[tokio::test]
    async fn exhausted_coupon_is_rejected() {
        let mut c = coupon("CAPPED", DiscountKind::Percentage, 20, CouponScope::All)
            .with_max_uses(1);
        c.record_use();
        let handler = handler(vec![c], vec![]);
        let result = handler.handle("CAPPED", None).await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("Coupon usage limit reached"));
    }

    #[tokio::test]
    async fn one_time_coupon_rejects_subscription_product() {
        let product = Product::try_new(
            ProductId::new(),
            "Pro",
            ProductKind::Subscription,
            2000,
            "usd",
            Some(BillingInterval::Month),
        )
        .unwrap();
        let product_id = product.id;
        let handler = handler(
            vec![coupon("ONETIME", DiscountKind::Percentage, 20, CouponScope::OneTimeOnly)],
            vec![product],
        );

        let result = handler.handle("ONETIME", Some(product_id)).await.unwrap();
        assert!(!result.valid);
        assert_eq!(
            result.error.as_deref(),
            Some("Coupon only applies to one-time products")
        );
    }

    #[tokio::test]
    async fn scope_is_skipped_without_product() {
        let handler = handler(
            vec![coupon("ONETIME", DiscountKind::Percentage, 20, CouponScope::OneTimeOnly)],
            vec![],
        );
        let result = handler.handle("ONETIME", None).await.unwrap();
        assert!(result.valid);
    }

    #[tokio::test]
    async fn missing_product_is_rejected() {
        let handler = handler(
            vec![coupon("SAVE", DiscountKind::Percentage, 20, CouponScope::All)],
            vec![],
        );
        let result = handler.handle("SAVE", Some(ProductId::new())).await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("Product not found"));
    }

    #[tokio::test]
    async fn valid_percentage_coupon_includes_display_text() {
        let handler = handler(
            vec![coupon("SAVE20", DiscountKind::Percentage, 20, CouponScope::All)],
            vec![],
        );
        let result = handler.handle("SAVE20", None).await.unwrap();
        assert!(result.valid);
        let discount = result.discount.unwrap();
        assert_eq!(discount.value, 20);
        assert_eq!(discount.display_text, "20% off");
    }
}
