//! Foundation value objects shared across the billing domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{
    CouponId, PaymentIntentId, ProductId, PurchaseId, ReminderId, SubscriptionId, UserId,
};
pub use timestamp::Timestamp;
