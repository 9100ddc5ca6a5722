//! Coupon repository port.

use async_trait::async_trait;

use crate::domain::billing::Coupon;
use crate::domain::foundation::{CouponId, DomainError};

/// Repository port for Coupon records.
#[async_trait]
pub trait CouponRepository: Send + Sync {
    /// Insert a new coupon.
    async fn save(&self, coupon: &Coupon) -> Result<(), DomainError>;

    /// Update an existing coupon (mirror id, usage counter).
    async fn update(&self, coupon: &Coupon) -> Result<(), DomainError>;

    /// Find a coupon by id. Returns `None` if absent.
    async fn find_by_id(&self, id: &CouponId) -> Result<Option<Coupon>, DomainError>;

    /// Find an active coupon by its (uppercased) code.
    ///
    /// Lookup is case-normalized by the caller; inactive coupons are not
    /// returned, matching "not found or inactive" validation semantics.
    async fn find_active_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError>;

    /// Find a coupon by code regardless of activity, for webhook-side usage
    /// bookkeeping of codes recorded at checkout time.
    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, DomainError>;

    /// Best-effort usage increment: read the coupon, bump `current_uses`,
    /// write it back. Returns `false` when the coupon no longer exists.
    ///
    /// There is no cross-record transaction; concurrent increments can race
    /// and undercount. That weakness is accepted and documented rather than
    /// hidden behind a stronger contract the store cannot honor.
    async fn increment_usage(&self, id: &CouponId) -> Result<bool, DomainError>;
}
